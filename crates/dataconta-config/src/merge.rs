//! Merging of config layers.

use toml::Value;

/// Merge `overlay` into `base`. Tables combine key by key; any other value in
/// the overlay, arrays included, replaces what `base` had.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    if let (Value::Table(target), Value::Table(layer)) = (&mut *base, overlay) {
        for (key, value) in layer {
            match target.get_mut(key) {
                Some(existing) => deep_merge(existing, value),
                None => {
                    target.insert(key.clone(), value.clone());
                },
            }
        }
        return;
    }
    *base = overlay.clone();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_merge_and_arrays_replace() {
        let mut base: toml::Value = toml::from_str(
            r#"
            [logging]
            level = "info"
            format = "compact"
            directives = ["a=debug"]
        "#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
            [logging]
            level = "debug"
            directives = ["b=trace"]

            [menu]
            config_file = "m.json"
        "#,
        )
        .unwrap();

        deep_merge(&mut base, &overlay);
        assert_eq!(base["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(base["logging"]["format"].as_str(), Some("compact"));
        let directives = base["logging"]["directives"].as_array().unwrap();
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].as_str(), Some("b=trace"));
        assert_eq!(base["menu"]["config_file"].as_str(), Some("m.json"));
    }
}
