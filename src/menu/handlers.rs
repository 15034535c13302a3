use crate::component::RandomClipSplitter;
use crate::config::Config;
use crate::pause;
use anyhow::Result;
use console::{Term, style};
use rust_i18n::t;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn run_random_clip_splitter(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
) -> Result<()> {
    let mut splitter = RandomClipSplitter::new(config.clone(), Arc::clone(shutdown_signal));

    if let Err(e) = splitter.run() {
        eprintln!("{} {:#}", style(t!("main_menu.error_prefix")).red().bold(), e);
    }

    // 保留這次寫入的最近路徑與參數
    *config = splitter.into_config();

    pause(term)?;
    Ok(())
}
