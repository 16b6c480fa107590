// ═══════════════════════════════════════════════════════════════════
// Error Tests — CoreError display, classification, conversions
// ═══════════════════════════════════════════════════════════════════

use coinchart_core::errors::CoreError;

mod display {
    use super::*;

    #[test]
    fn api_error_names_provider() {
        let err = CoreError::Api {
            provider: "CoinGecko".into(),
            message: "429 Too Many Requests".into(),
        };
        assert_eq!(err.to_string(), "API error (CoinGecko): 429 Too Many Requests");
    }

    #[test]
    fn insufficient_data_matches_placeholder_wording() {
        assert_eq!(CoreError::InsufficientData.to_string(), "Not enough data for chart");
    }

    #[test]
    fn unknown_range() {
        let err = CoreError::UnknownRange("2W".into());
        assert_eq!(err.to_string(), "Unknown chart range: 2W");
    }
}

mod classification {
    use super::*;

    #[test]
    fn transport_errors() {
        assert!(CoreError::Network("timeout".into()).is_transport());
        assert!(CoreError::Api {
            provider: "x".into(),
            message: "y".into()
        }
        .is_transport());
        assert!(!CoreError::InsufficientData.is_transport());
        assert!(!CoreError::FileIO("disk".into()).is_transport());
    }

    #[test]
    fn insufficient_data() {
        assert!(CoreError::InsufficientData.is_insufficient_data());
        assert!(!CoreError::RenderTargetUnavailable.is_insufficient_data());
    }

    #[test]
    fn configuration() {
        assert!(CoreError::RenderTargetUnavailable.is_configuration());
        assert!(!CoreError::ValidationError("x".into()).is_configuration());
    }
}

mod conversions {
    use super::*;

    #[test]
    fn from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CoreError = io.into();
        assert!(matches!(err, CoreError::FileIO(msg) if msg.contains("missing")));
    }

    #[test]
    fn from_json_error() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: CoreError = json_err.into();
        assert!(matches!(err, CoreError::Deserialization(_)));
    }

    #[test]
    fn from_bincode_error() {
        let bin_err = bincode::deserialize::<String>(&[0xff]).unwrap_err();
        let err: CoreError = bin_err.into();
        assert!(matches!(err, CoreError::Serialization(_)));
    }
}
