//! License gate: which credentials may sign off which kind of service.
//!
//! A closed two-level table keyed by service domain then service type. The
//! gate is pure and total: unknown combinations are never licensed, and a
//! credential matches only by exact string equality.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The asset domain a service was performed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceDomain {
    Automotive,
    Residential,
    Marine,
    Aviation,
}

impl ServiceDomain {
    pub const ALL: [ServiceDomain; 4] = [
        ServiceDomain::Automotive,
        ServiceDomain::Residential,
        ServiceDomain::Marine,
        ServiceDomain::Aviation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceDomain::Automotive => "AUTOMOTIVE",
            ServiceDomain::Residential => "RESIDENTIAL",
            ServiceDomain::Marine => "MARINE",
            ServiceDomain::Aviation => "AVIATION",
        }
    }
}

impl FromStr for ServiceDomain {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

impl fmt::Display for ServiceDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of work performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    Maintenance,
    Repair,
    Upgrade,
    Inspection,
}

impl ServiceType {
    pub const ALL: [ServiceType; 4] = [
        ServiceType::Maintenance,
        ServiceType::Repair,
        ServiceType::Upgrade,
        ServiceType::Inspection,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::Maintenance => "MAINTENANCE",
            ServiceType::Repair => "REPAIR",
            ServiceType::Upgrade => "UPGRADE",
            ServiceType::Inspection => "INSPECTION",
        }
    }
}

impl FromStr for ServiceType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string that names no known domain or service type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant: {}", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// Credentials accepted for a (domain, service type) pair.
pub fn accepted_credentials(domain: ServiceDomain, service_type: ServiceType) -> &'static [&'static str] {
    use ServiceDomain::*;
    use ServiceType::*;

    match (domain, service_type) {
        (Automotive, Maintenance) => &["ASE_CERTIFIED", "ASE_MASTER", "OEM_CERTIFIED"],
        (Automotive, Repair) => &["ASE_MASTER", "OEM_CERTIFIED"],
        (Automotive, Upgrade) => &["ASE_MASTER", "OEM_CERTIFIED"],
        (Automotive, Inspection) => &["STATE_INSPECTOR", "ASE_CERTIFIED"],

        (Residential, Maintenance) => &["LICENSED_HANDYMAN", "LICENSED_PLUMBER", "LICENSED_ELECTRICIAN"],
        (Residential, Repair) => &["LICENSED_PLUMBER", "LICENSED_ELECTRICIAN", "GC_LICENSE"],
        (Residential, Upgrade) => &["GC_LICENSE", "LICENSED_ELECTRICIAN"],
        (Residential, Inspection) => &["GC_LICENSE"],

        (Marine, Maintenance) => &["MARINE_TECH_CERT"],
        (Marine, Repair) => &["MARINE_TECH_CERT"],
        (Marine, Upgrade) => &["MARINE_TECH_CERT"],
        (Marine, Inspection) => &["MARINE_INSPECTOR"],

        (Aviation, Maintenance) => &["A_AND_P"],
        (Aviation, Repair) => &["A_AND_P"],
        (Aviation, Upgrade) => &["A_AND_P", "IA"],
        (Aviation, Inspection) => &["IA"],
    }
}

/// Check whether any of the provider's licenses is accepted for the pair.
pub fn is_licensed<S: AsRef<str>>(
    domain: ServiceDomain,
    service_type: ServiceType,
    provider_licenses: &[S],
) -> bool {
    let accepted = accepted_credentials(domain, service_type);
    provider_licenses
        .iter()
        .any(|license| accepted.contains(&license.as_ref()))
}

/// String-keyed variant of [`is_licensed`]. Unknown keys are never licensed.
pub fn is_licensed_raw<S: AsRef<str>>(domain: &str, service_type: &str, provider_licenses: &[S]) -> bool {
    match (domain.parse::<ServiceDomain>(), service_type.parse::<ServiceType>()) {
        (Ok(domain), Ok(service_type)) => is_licensed(domain, service_type, provider_licenses),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn all_credentials() -> BTreeSet<&'static str> {
        ServiceDomain::ALL
            .iter()
            .flat_map(|d| ServiceType::ALL.iter().map(move |t| accepted_credentials(*d, *t)))
            .flat_map(|creds| creds.iter().copied())
            .collect()
    }

    #[test]
    fn test_known_pairs() {
        assert!(is_licensed(ServiceDomain::Automotive, ServiceType::Repair, &["ASE_MASTER"]));
        assert!(!is_licensed(ServiceDomain::Automotive, ServiceType::Repair, &["ASE_CERTIFIED"]));
        assert!(is_licensed(ServiceDomain::Aviation, ServiceType::Upgrade, &["IA"]));
        assert!(!is_licensed(ServiceDomain::Aviation, ServiceType::Maintenance, &["IA"]));
    }

    #[test]
    fn test_empty_licenses_never_pass() {
        for d in ServiceDomain::ALL {
            for t in ServiceType::ALL {
                assert!(!is_licensed::<&str>(d, t, &[]));
            }
        }
    }

    #[test]
    fn test_raw_unknown_keys_are_closed_world() {
        assert!(!is_licensed_raw("SPACE", "REPAIR", &["ASE_MASTER"]));
        assert!(!is_licensed_raw("AUTOMOTIVE", "DETAILING", &["ASE_MASTER"]));
        assert!(!is_licensed_raw("automotive", "REPAIR", &["ASE_MASTER"]));
        assert!(is_licensed_raw("AUTOMOTIVE", "REPAIR", &["ASE_MASTER"]));
    }

    #[test]
    fn test_no_partial_or_case_insensitive_match() {
        assert!(!is_licensed(ServiceDomain::Marine, ServiceType::Repair, &["marine_tech_cert"]));
        assert!(!is_licensed(ServiceDomain::Marine, ServiceType::Repair, &["MARINE_TECH"]));
        assert!(!is_licensed(ServiceDomain::Marine, ServiceType::Repair, &["*"]));
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&ServiceDomain::Residential).unwrap(), "\"RESIDENTIAL\"");
        assert_eq!(
            serde_json::from_str::<ServiceType>("\"INSPECTION\"").unwrap(),
            ServiceType::Inspection
        );
    }

    fn pair() -> impl Strategy<Value = (ServiceDomain, ServiceType)> {
        (0usize..4, 0usize..4).prop_map(|(d, t)| (ServiceDomain::ALL[d], ServiceType::ALL[t]))
    }

    proptest! {
        #[test]
        fn outside_credentials_always_rejected((domain, service_type) in pair(), extra in "[A-Z_]{1,12}") {
            let accepted = accepted_credentials(domain, service_type);
            let outside: Vec<String> = all_credentials()
                .into_iter()
                .filter(|c| !accepted.contains(c))
                .map(String::from)
                .chain(std::iter::once(extra).filter(|e| !accepted.contains(&e.as_str())))
                .collect();
            prop_assert!(!is_licensed(domain, service_type, &outside));
        }

        #[test]
        fn one_accepted_credential_suffices((domain, service_type) in pair(), pick in any::<prop::sample::Index>()) {
            let accepted = accepted_credentials(domain, service_type);
            let chosen = accepted[pick.index(accepted.len())];
            let licenses = vec!["UNRELATED".to_string(), chosen.to_string()];
            prop_assert!(is_licensed(domain, service_type, &licenses));
        }
    }
}
