use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Client counts covered by the experiment.
pub const CLIENT_COUNTS: [u32; 6] = [1, 2, 4, 8, 16, 32];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mobility {
    Static,
    Mobile,
}

impl Mobility {
    pub const ALL: [Mobility; 2] = [Mobility::Static, Mobility::Mobile];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mobility::Static => "static",
            Mobility::Mobile => "mobile",
        }
    }
}

impl fmt::Display for Mobility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mobility {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(Mobility::Static),
            "mobile" => Ok(Mobility::Mobile),
            other => Err(ValidationError::Mobility(other.to_string())),
        }
    }
}

/// Application traffic carried by every client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficMix {
    /// Constant bit-rate over UDP.
    Cbr,
    Tcp,
    /// Half of the clients on CBR, half on TCP.
    Mixed,
}

impl TrafficMix {
    pub const ALL: [TrafficMix; 3] = [TrafficMix::Cbr, TrafficMix::Tcp, TrafficMix::Mixed];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficMix::Cbr => "cbr",
            TrafficMix::Tcp => "tcp",
            TrafficMix::Mixed => "mixed",
        }
    }
}

impl fmt::Display for TrafficMix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrafficMix {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cbr" => Ok(TrafficMix::Cbr),
            "tcp" => Ok(TrafficMix::Tcp),
            "mixed" => Ok(TrafficMix::Mixed),
            other => Err(ValidationError::TrafficMix(other.to_string())),
        }
    }
}

pub fn validate_client_count(clients: u32) -> Result<u32, ValidationError> {
    if CLIENT_COUNTS.contains(&clients) {
        Ok(clients)
    } else {
        Err(ValidationError::ClientCount(clients))
    }
}

/// Identity of one experiment run.
///
/// The derived ordering (clients, then mobility, then traffic) is the
/// listing order used everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawScenarioKey")]
pub struct ScenarioKey {
    clients: u32,
    mobility: Mobility,
    traffic: TrafficMix,
}

#[derive(Deserialize)]
struct RawScenarioKey {
    clients: u32,
    mobility: Mobility,
    traffic: TrafficMix,
}

impl TryFrom<RawScenarioKey> for ScenarioKey {
    type Error = ValidationError;

    fn try_from(raw: RawScenarioKey) -> Result<Self, Self::Error> {
        ScenarioKey::new(raw.clients, raw.mobility, raw.traffic)
    }
}

impl ScenarioKey {
    pub fn new(
        clients: u32,
        mobility: Mobility,
        traffic: TrafficMix,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            clients: validate_client_count(clients)?,
            mobility,
            traffic,
        })
    }

    pub fn clients(&self) -> u32 {
        self.clients
    }

    pub fn mobility(&self) -> Mobility {
        self.mobility
    }

    pub fn traffic(&self) -> TrafficMix {
        self.traffic
    }

    /// Same scenario with the other mobility mode.
    pub fn with_mobility(&self, mobility: Mobility) -> Self {
        Self { mobility, ..*self }
    }

    /// Storage name of the scenario, `c{clients}_{mobility}_{traffic}`.
    pub fn canonical_name(&self) -> String {
        format!("c{}_{}_{}", self.clients, self.mobility, self.traffic)
    }

    /// Inverse of [`ScenarioKey::canonical_name`]. Returns `None` for anything
    /// outside the key grammar, including out-of-domain client counts.
    pub fn parse_canonical(name: &str) -> Option<Self> {
        let rest = name.strip_prefix('c')?;
        let mut parts = rest.splitn(3, '_');
        let clients_raw = parts.next()?;
        if clients_raw.is_empty() || !clients_raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let clients = clients_raw.parse().ok()?;
        let mobility = parts.next()?.parse().ok()?;
        let traffic = parts.next()?.parse().ok()?;
        ScenarioKey::new(clients, mobility, traffic).ok()
    }
}

impl fmt::Display for ScenarioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_name())
    }
}

/// Finite domains swept by the enumerator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioGrid {
    pub clients: Vec<u32>,
    pub mobility: Vec<Mobility>,
    pub traffic: Vec<TrafficMix>,
}

impl Default for ScenarioGrid {
    fn default() -> Self {
        Self {
            clients: CLIENT_COUNTS.to_vec(),
            mobility: Mobility::ALL.to_vec(),
            traffic: TrafficMix::ALL.to_vec(),
        }
    }
}

impl ScenarioGrid {
    /// Every key of the grid in listing order, without duplicates.
    pub fn keys(&self) -> Result<Vec<ScenarioKey>, ValidationError> {
        if self.clients.is_empty() {
            return Err(ValidationError::EmptyGrid("clients"));
        }
        if self.mobility.is_empty() {
            return Err(ValidationError::EmptyGrid("mobility"));
        }
        if self.traffic.is_empty() {
            return Err(ValidationError::EmptyGrid("traffic"));
        }

        let mut keys = Vec::with_capacity(self.len());
        for &clients in &self.clients {
            for &mobility in &self.mobility {
                for &traffic in &self.traffic {
                    keys.push(ScenarioKey::new(clients, mobility, traffic)?);
                }
            }
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    /// Upper bound on the number of keys (before de-duplication).
    pub fn len(&self) -> usize {
        self.clients.len() * self.mobility.len() * self.traffic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_grid_has_36_ordered_keys() {
        let keys = ScenarioGrid::default().keys().unwrap();
        assert_eq!(keys.len(), 36);
        assert_eq!(keys[0].canonical_name(), "c1_static_cbr");
        assert_eq!(keys[1].canonical_name(), "c1_static_tcp");
        assert_eq!(keys[2].canonical_name(), "c1_static_mixed");
        assert_eq!(keys[3].canonical_name(), "c1_mobile_cbr");
        assert_eq!(keys[35].canonical_name(), "c32_mobile_mixed");
    }

    #[test]
    fn test_grid_rejects_out_of_domain_clients() {
        let grid = ScenarioGrid {
            clients: vec![1, 3],
            ..Default::default()
        };
        assert_eq!(grid.keys(), Err(ValidationError::ClientCount(3)));
    }

    #[test]
    fn test_grid_deduplicates_and_sorts() {
        let grid = ScenarioGrid {
            clients: vec![8, 1, 8],
            mobility: vec![Mobility::Mobile],
            traffic: vec![TrafficMix::Tcp],
        };
        let names: Vec<_> = grid.keys().unwrap().iter().map(|k| k.canonical_name()).collect();
        assert_eq!(names, vec!["c1_mobile_tcp", "c8_mobile_tcp"]);
    }

    #[test]
    fn test_empty_dimension_is_rejected() {
        let grid = ScenarioGrid {
            traffic: vec![],
            ..Default::default()
        };
        assert_eq!(grid.keys(), Err(ValidationError::EmptyGrid("traffic")));
    }

    #[test]
    fn test_canonical_name_roundtrips() {
        for key in ScenarioGrid::default().keys().unwrap() {
            assert_eq!(ScenarioKey::parse_canonical(&key.canonical_name()), Some(key));
        }
    }

    #[test]
    fn test_parse_canonical_rejects_foreign_names() {
        for name in [
            "c3_static_cbr",
            "c1_walking_cbr",
            "c1_static_udp",
            "x1_static_cbr",
            "c_static_cbr",
            "c+1_static_cbr",
            "c1_static_cbr_extra",
            "c1_static",
            "",
        ] {
            assert_eq!(ScenarioKey::parse_canonical(name), None, "{name}");
        }
    }

    #[test]
    fn test_parse_dimension_errors_are_descriptive() {
        let err = "walking".parse::<Mobility>().unwrap_err();
        assert!(err.to_string().contains("walking"));
        let err = "udp".parse::<TrafficMix>().unwrap_err();
        assert_eq!(err, ValidationError::TrafficMix("udp".into()));
    }

    #[test]
    fn test_deserialize_validates_key() {
        #[derive(Deserialize)]
        struct Holder {
            key: ScenarioKey,
        }
        let ok: Holder =
            toml::from_str("[key]\nclients = 4\nmobility = \"mobile\"\ntraffic = \"mixed\"").unwrap();
        assert_eq!(ok.key.canonical_name(), "c4_mobile_mixed");

        let bad = toml::from_str::<Holder>("[key]\nclients = 5\nmobility = \"static\"\ntraffic = \"tcp\"");
        assert!(bad.is_err());
    }
}
