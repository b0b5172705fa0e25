use atnd::probe::l2ping::DEFAULT_PROGRAM;
use atnd::storage::{KEY_FILE_NAME, REGISTRY_FILE_NAME};

use super::config::CONFIG_FILE_NAME;

/// Print the version and the file layout this build expects
pub fn execute() {
    for line in render() {
        println!("{}", line);
    }
}

fn render() -> Vec<String> {
    vec![
        format!("atnd {}", env!("CARGO_PKG_VERSION")),
        format!("config:   {} (next to the executable unless --config)", CONFIG_FILE_NAME),
        format!(
            "registry: {} + {} (next to the executable unless --data-dir)",
            REGISTRY_FILE_NAME, KEY_FILE_NAME
        ),
        format!("probe:    {} (override with [probe] program)", DEFAULT_PROGRAM),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_names_files_and_probe() {
        let lines = render();

        assert_eq!(lines[0], format!("atnd {}", env!("CARGO_PKG_VERSION")));
        assert!(lines[1].contains("atnd.toml"));
        assert!(lines[2].contains("atnd_config.json"));
        assert!(lines[2].contains(".atnd_key"));
        assert!(lines[3].contains("l2ping"));
    }
}
