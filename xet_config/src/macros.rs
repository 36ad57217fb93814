/// Declares a configuration value group.
///
/// ```ignore
/// config_group!("client" => {
///     /// Doc comment surfaced on the struct field.
///     ref num_download_workers: usize = 8;
/// });
/// ```
///
/// Expands to a `ConfigValueGroup` struct with those fields, a `Default`
/// carrying the given expressions, and `apply_env_overrides` reading
/// `XET_{GROUP}_{FIELD}` (upper-cased) for each field.
#[macro_export]
macro_rules! config_group {
    ($group:literal => {
        $(
            $(#[$meta:meta])*
            ref $name:ident : $type:ty = $default:expr;
        )+
    }) => {
        #[derive(Debug, Clone)]
        pub struct ConfigValueGroup {
            $(
                $(#[$meta])*
                pub $name: $type,
            )+
        }

        impl Default for ConfigValueGroup {
            fn default() -> Self {
                Self {
                    $(
                        $name: $default,
                    )+
                }
            }
        }

        impl ConfigValueGroup {
            pub fn new() -> Self {
                Self::default()
            }

            /// Applies `XET_{GROUP}_{FIELD}` environment overrides in place.
            pub fn apply_env_overrides(&mut self) {
                $(
                    {
                        let env_var =
                            concat!("XET_", $group, "_", stringify!($name)).to_ascii_uppercase();
                        if let Ok(raw) = std::env::var(&env_var) {
                            self.$name = $crate::parse_config_value(&env_var, &raw, self.$name.clone());
                        }
                    }
                )+
            }
        }

        pub(crate) type ConfigValues = ConfigValueGroup;
    };
}
