use quill_domain::config::{
    DatabaseConfig, MediaConfig, PasswordValidatorConfig, Secret, ServerConfig, Settings,
};
use serde_json::json;

#[test]
fn defaults_follow_the_documented_fallbacks() {
    let settings = Settings::default();
    assert!(!settings.debug, "debug must default to false");
    assert!(settings.secret_key.is_empty());
    assert!(settings.allowed_hosts.is_empty());
    assert_eq!(settings.installed_apps, ["blog", "admin"]);
    assert_eq!(settings.middleware, ["security", "allowed_hosts", "trace"]);
    assert_eq!(settings.locale.language_code, "en-us");
    assert_eq!(settings.locale.time_zone, "UTC");
    assert!(settings.locale.use_i18n && settings.locale.use_tz);
    assert_eq!(settings.password_validators.len(), 4);

    let server = ServerConfig::default();
    assert_eq!(server.port, 8000);
    assert!(server.ssl.is_none());

    let db = DatabaseConfig::default();
    assert!(db.url.is_empty());
    assert_eq!((db.namespace.as_str(), db.database.as_str()), ("quill", "blog"));

    let media = MediaConfig::default();
    assert!(media.cloudinary.is_none());
    assert_eq!(media.folder, "images");
}

#[test]
fn deserializes_partial_documents() {
    let raw = json!({
        "secret_key": "s3cr3t",
        "debug": true,
        "server": { "port": 9000 },
        "database": { "url": "mem://" },
        "password_validators": [
            { "name": "minimum_length", "min_length": 12 },
            { "name": "numeric" }
        ],
        "media": {
            "cloudinary": { "cloud_name": "demo", "api_key": "123", "api_secret": "abc" }
        }
    });

    let settings: Settings = serde_json::from_value(raw).expect("settings deserialize");
    assert!(settings.debug);
    assert_eq!(settings.secret_key.expose(), "s3cr3t");
    assert_eq!(settings.server.port, 9000);
    assert_eq!(settings.database.url, "mem://");
    assert_eq!(settings.database.namespace, "quill");
    assert_eq!(
        settings.password_validators,
        [PasswordValidatorConfig::MinimumLength { min_length: 12 }, PasswordValidatorConfig::Numeric]
    );
    let cloudinary = settings.media.cloudinary.as_ref().expect("cloudinary");
    assert_eq!(cloudinary.cloud_name, "demo");
    assert_eq!(settings.media.folder, "images");
}

#[test]
fn secrets_are_redacted_in_debug_output() {
    let secret = Secret::new("hunter2");
    assert_eq!(format!("{secret:?}"), "Secret(***)");
    assert_eq!(secret.expose(), "hunter2");

    let mut settings = Settings::default();
    settings.secret_key = secret;
    assert!(!format!("{settings:?}").contains("hunter2"));
}
