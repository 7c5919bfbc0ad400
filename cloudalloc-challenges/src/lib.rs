pub const QUALITY_PRECISION: i32 = 1_000_000;

macro_rules! impl_kv_string_serde {
    ($name:ident { $( $field:ident : $ty:ty ),* $(,)? }) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            $( pub $field : $ty ),*
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let parts: Vec<String> = vec![
                    $( format!("{}={}", stringify!($field), self.$field) ),*
                ];
                write!(f, "{}", parts.join(","))
            }
        }

        impl std::str::FromStr for $name {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut kv = std::collections::HashMap::new();
                for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    let (k, v) = pair
                        .split_once('=')
                        .ok_or_else(|| anyhow::anyhow!("Invalid key-value pair '{}'", pair))?;
                    kv.insert(k.trim(), v.trim());
                }
                Ok(Self {
                    $(
                        $field: kv
                            .get(stringify!($field))
                            .ok_or_else(|| anyhow::anyhow!("Missing key '{}'", stringify!($field)))?
                            .parse::<$ty>()
                            .map_err(|e| {
                                anyhow::anyhow!("Invalid value for '{}': {}", stringify!($field), e)
                            })?,
                    )*
                })
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

pub mod error;
pub use error::AllocationError;
pub mod resource_allocation;
