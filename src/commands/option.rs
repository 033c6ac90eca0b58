//! Option lookup for renderers
//!
//! Thin surface over the option cache so status-bar templates can read
//! namespaced options with a default fallback.

use eyre::Result;

use crate::cache::{OptionCache, TmuxOptions};
use crate::config::Config;
use crate::telemetry;

pub fn run(key: &str, default: &str, config: &Config) -> Result<()> {
    let recorder = telemetry::init(config);
    let mut options = OptionCache::new(TmuxOptions);

    let value = options.get_tracked(key, default, recorder.as_ref());
    println!("{}", value);
    Ok(())
}
