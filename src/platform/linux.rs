// QuietBrowser platform paths for Linux
// Config: $XDG_CONFIG_HOME/quietbrowser, else ~/.config/quietbrowser

use std::env;
use std::path::PathBuf;

/// Returns the configuration directory for QuietBrowser on Linux.
pub fn get_config_dir() -> PathBuf {
    config_dir_from(env::var("XDG_CONFIG_HOME").ok(), env::var("HOME").ok())
}

fn config_dir_from(xdg_config_home: Option<String>, home: Option<String>) -> PathBuf {
    match xdg_config_home.filter(|x| !x.is_empty()) {
        Some(xdg) => PathBuf::from(xdg).join("quietbrowser"),
        None => PathBuf::from(home.unwrap_or_else(|| String::from("/tmp")))
            .join(".config")
            .join("quietbrowser"),
    }
}
