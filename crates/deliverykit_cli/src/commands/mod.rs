//! CLI command implementations.

pub mod entry;
pub mod query;
pub mod sync;

use crate::GlobalArgs;
use deliverykit_client::{ClientConfig, DeliveryClient, ReqwestClient};
use deliverykit_query::Scalar;

/// Builds a client from the global arguments.
pub fn build_client(
    global: &GlobalArgs,
) -> Result<DeliveryClient<ReqwestClient>, Box<dyn std::error::Error>> {
    let api_key = global.api_key.clone().ok_or("--api-key is required")?;
    let token = global
        .delivery_token
        .clone()
        .ok_or("--delivery-token is required")?;
    let environment = global
        .environment
        .clone()
        .ok_or("--environment is required")?;

    let mut config = ClientConfig::new(api_key, token, environment).with_region(global.region);
    if let Some(host) = &global.host {
        config = config.with_host(host.clone());
    }
    Ok(DeliveryClient::from_config(config)?)
}

/// Prints a value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parses a command-line literal: integers, floats and booleans keep
/// their type, anything else stays a string.
pub fn parse_literal(raw: &str) -> Scalar {
    if let Ok(i) = raw.parse::<i64>() {
        return Scalar::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return Scalar::Float(f);
        }
    }
    match raw {
        "true" => Scalar::Bool(true),
        "false" => Scalar::Bool(false),
        _ => Scalar::Text(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deliverykit_client::Region;

    fn global() -> GlobalArgs {
        GlobalArgs {
            api_key: Some("key".into()),
            delivery_token: Some("token".into()),
            environment: None,
            region: Region::Us,
            host: None,
            verbose: false,
        }
    }

    #[test]
    fn literals_keep_their_type() {
        assert_eq!(parse_literal("42"), Scalar::Integer(42));
        assert_eq!(parse_literal("4.5"), Scalar::Float(4.5));
        assert_eq!(parse_literal("true"), Scalar::Bool(true));
        assert_eq!(parse_literal("Women"), Scalar::Text("Women".into()));
        assert_eq!(parse_literal("NaN"), Scalar::Text("NaN".into()));
    }

    #[test]
    fn missing_environment_is_reported() {
        let err = build_client(&global()).err().unwrap();
        assert!(err.to_string().contains("--environment"));
    }
}
