// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

/// Server-assigned record identifiers. They serialize as bare integers.
macro_rules! record_ids {
    ($($(#[$meta:meta])* $name:ident;)+) => {$(
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                raw.trim().parse().map(Self)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    )+};
}

record_ids! {
    CallId;
    CampaignId;
}

#[cfg(test)]
mod tests {
    use super::CallId;

    #[test]
    fn ids_deserialize_from_bare_integers() -> anyhow::Result<()> {
        let id: CallId = serde_json::from_str("42")?;
        assert_eq!(id, CallId::new(42));
        assert_eq!(id.to_string(), "42");
        assert_eq!(" 7 ".parse::<CallId>()?, CallId::from(7));
        assert!("x".parse::<CallId>().is_err());
        Ok(())
    }
}
