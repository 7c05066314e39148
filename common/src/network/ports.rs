//! # Port Sets
//!
//! The set of TCP ports handed to a probe collaborator.
//!
//! Accepted textual forms:
//! * **Keywords**: "common" (well-known service ports), "all" (1-65535).
//! * **Lists and ranges**: "22", "22,80,443", "8000-8100", "22,8000-8010".

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigurationError;

const COMMON_PORTS: &[u16] = &[
    20, 21, 22, 23, 25, 53, 67, 68, 69, 80, 88, 110, 111, 123, 135, 137, 138, 139, 143, 161,
    389, 443, 445, 465, 514, 548, 587, 631, 636, 873, 993, 995, 1080, 1433, 1521, 1723, 1883,
    2049, 2375, 3000, 3306, 3389, 5000, 5060, 5353, 5432, 5900, 6379, 8000, 8080, 8443, 8888,
    9000, 9090, 9100, 9200, 27017,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSet(BTreeSet<u16>);

impl PortSet {
    pub fn common() -> Self {
        Self(COMMON_PORTS.iter().copied().collect())
    }

    pub fn all() -> Self {
        Self((1..=u16::MAX).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, port: u16) -> bool {
        self.0.contains(&port)
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied()
    }
}

impl Default for PortSet {
    fn default() -> Self {
        Self::common()
    }
}

impl FromIterator<u16> for PortSet {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for PortSet {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "common" => return Ok(Self::common()),
            "all" => return Ok(Self::all()),
            _ => {}
        }

        let invalid = || ConfigurationError::InvalidPortSpec(s.to_string());
        let mut ports = BTreeSet::new();

        for part in s.split(',').map(str::trim) {
            if let Some((start, end)) = part.split_once('-') {
                let start: u16 = start.trim().parse().map_err(|_| invalid())?;
                let end: u16 = end.trim().parse().map_err(|_| invalid())?;
                if start == 0 || start > end {
                    return Err(invalid());
                }
                ports.extend(start..=end);
            } else {
                let port: u16 = part.parse().map_err(|_| invalid())?;
                if port == 0 {
                    return Err(invalid());
                }
                ports.insert(port);
            }
        }

        Ok(Self(ports))
    }
}

impl fmt::Display for PortSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ports", self.0.len())
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
