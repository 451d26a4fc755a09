//! Property-based tests for connection configuration normalization
//!
//! These tests verify that:
//! - Every port in 1..=65535 is encoded verbatim
//! - Every other non-zero port is rejected
//! - Empty fields always resolve to their documented defaults
//! - Non-empty fields always pass through unchanged

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use pgstore::config::ConnectionConfig;
    use pgstore::core::db::descriptor::{
        normalize, DEFAULT_DBNAME, DEFAULT_HOST, DEFAULT_PASSWORD, DEFAULT_PORT, DEFAULT_TIMEZONE,
        DEFAULT_USERNAME,
    };
    use pgstore::core::StoreError;

    fn arb_field() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_./-]{1,24}"
    }

    fn field<'a>(dsn: &'a str, key: &str) -> &'a str {
        dsn.split(' ')
            .find_map(|pair| pair.strip_prefix(key).and_then(|rest| rest.strip_prefix('=')))
            .unwrap_or_else(|| panic!("{key} missing from {dsn}"))
    }

    proptest! {
        #[test]
        fn valid_ports_encode_verbatim(port in 1i64..=65535) {
            let config = ConnectionConfig { port, ..Default::default() };
            let dsn = normalize(&config).unwrap().to_string();
            let expected = port.to_string();
            prop_assert_eq!(field(&dsn, "port"), expected.as_str());
        }

        #[test]
        fn out_of_range_ports_rejected(
            port in prop_oneof![i64::MIN..=-1i64, 65536i64..=i64::MAX]
        ) {
            let config = ConnectionConfig { port, ..Default::default() };
            let result = normalize(&config);
            prop_assert!(matches!(result, Err(StoreError::Validation(_))));
        }

        #[test]
        fn zero_port_uses_default(
            host in arb_field(),
            dbname in arb_field(),
            ssl in any::<bool>(),
        ) {
            let config = ConnectionConfig { host, dbname, ssl, port: 0, ..Default::default() };
            let dsn = normalize(&config).unwrap().to_string();
            let expected = DEFAULT_PORT.to_string();
            prop_assert_eq!(field(&dsn, "port"), expected.as_str());
        }

        #[test]
        fn fields_pass_through(
            host in arb_field(),
            username in arb_field(),
            password in arb_field(),
            dbname in arb_field(),
            timezone in arb_field(),
        ) {
            let config = ConnectionConfig {
                host: host.clone(),
                username: username.clone(),
                password: password.clone(),
                dbname: dbname.clone(),
                timezone: timezone.clone(),
                ..Default::default()
            };
            let descriptor = normalize(&config).unwrap();
            prop_assert_eq!(descriptor.host(), host.as_str());
            prop_assert_eq!(descriptor.user(), username.as_str());
            prop_assert_eq!(descriptor.password(), password.as_str());
            prop_assert_eq!(descriptor.dbname(), dbname.as_str());
            prop_assert_eq!(descriptor.timezone(), timezone.as_str());
        }

        #[test]
        fn empty_fields_use_defaults(ssl in any::<bool>(), port in 0i64..=65535) {
            let config = ConnectionConfig { ssl, port, ..Default::default() };
            let dsn = normalize(&config).unwrap().to_string();
            prop_assert_eq!(field(&dsn, "host"), DEFAULT_HOST);
            prop_assert_eq!(field(&dsn, "user"), DEFAULT_USERNAME);
            prop_assert_eq!(field(&dsn, "password"), DEFAULT_PASSWORD);
            prop_assert_eq!(field(&dsn, "dbname"), DEFAULT_DBNAME);
            prop_assert_eq!(field(&dsn, "TimeZone"), DEFAULT_TIMEZONE);
            prop_assert_eq!(field(&dsn, "sslmode"), if ssl { "enable" } else { "disable" });
        }
    }
}
