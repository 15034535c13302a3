use crate::component::random_clip_splitter::{EncodingPreset, OverlapPolicy, SelectionMode};
use crate::config::save::save_settings;
use crate::config::{Config, Language};
use crate::menu::handlers::run_random_clip_splitter;
use anyhow::Result;
use console::{Term, style};
use dialoguer::Select;
use dialoguer::theme::ColorfulTheme;
use rust_i18n::t;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn show_main_menu(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
) -> Result<bool> {
    term.clear_screen()?;

    println!("{}", style(t!("main_menu.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    let options = vec![
        t!("main_menu.opt_splitter"),
        t!("main_menu.opt_settings"),
        t!("main_menu.exit"),
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("main_menu.prompt"))
        .items(&options)
        .default(0)
        .interact_on_opt(term)?;

    match selection {
        Some(0) => {
            run_random_clip_splitter(term, shutdown_signal, config)?;
            Ok(true)
        }
        Some(1) => {
            show_settings_menu(term, config)?;
            Ok(true)
        }
        Some(2) | None => Ok(false), // ESC 直接離開
        _ => unreachable!(),
    }
}

/// 設定選單
fn show_settings_menu(term: &Term, config: &mut Config) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style(t!("settings.title")).cyan().bold());
        println!("{}", style(t!("common.esc_hint")).dim());

        let options = vec![
            t!("settings.opt_selection"),
            t!("settings.opt_overlap"),
            t!("settings.opt_scan"),
            t!("settings.opt_preset"),
            t!("settings.opt_language"),
            t!("settings.back"),
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("settings.prompt"))
            .items(&options)
            .default(0)
            .interact_on_opt(term)?;

        match selection {
            Some(0) => show_selection_mode_menu(term, config)?,
            Some(1) => show_overlap_menu(term, config)?,
            Some(2) => show_scan_menu(term, config)?,
            Some(3) => show_preset_menu(term, config)?,
            Some(4) => show_language_menu(term, config)?,
            Some(5) | None => break,
            _ => unreachable!(),
        }
    }

    Ok(())
}

/// 單選設定的共用流程：顯示目前值、選擇、變更時才寫入
///
/// 回傳使用者選擇的新值，ESC 或未變更時回傳 None
fn choose_setting<T: Copy + PartialEq>(
    term: &Term,
    title: &str,
    choices: &[(T, String)],
    current: T,
) -> Result<Option<T>> {
    term.clear_screen()?;

    println!("{}", style(title).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    let default_index = choices
        .iter()
        .position(|(value, _)| *value == current)
        .unwrap_or(0);
    println!(
        "\n{} {}\n",
        style(t!("settings.current")).dim(),
        choices[default_index].1
    );

    let items: Vec<&str> = choices.iter().map(|(_, label)| label.as_str()).collect();
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("settings.choose"))
        .items(&items)
        .default(default_index)
        .interact_on_opt(term)?;

    // ESC 不儲存
    let Some(selection) = selection else {
        return Ok(None);
    };

    let selected = choices[selection].0;
    Ok((selected != current).then_some(selected))
}

fn announce_saved(label: &str) {
    println!("\n{} {}", style(t!("settings.saved")).green(), label);
    std::thread::sleep(std::time::Duration::from_secs(1));
}

fn show_selection_mode_menu(term: &Term, config: &mut Config) -> Result<()> {
    let choices = [
        (SelectionMode::Random, t!("settings.selection.random").to_string()),
        (SelectionMode::InOrder, t!("settings.selection.in_order").to_string()),
    ];

    let current = config.settings.splitter.selection_mode;
    if let Some(mode) = choose_setting(term, &t!("settings.selection.title"), &choices, current)? {
        config.settings.splitter.selection_mode = mode;
        save_settings(&config.settings)?;
        if let Some((_, label)) = choices.iter().find(|(m, _)| *m == mode) {
            announce_saved(label);
        }
    }

    Ok(())
}

fn show_overlap_menu(term: &Term, config: &mut Config) -> Result<()> {
    let choices = [
        (OverlapPolicy::Allow, t!("settings.overlap.allow").to_string()),
        (OverlapPolicy::Avoid, t!("settings.overlap.avoid").to_string()),
    ];

    let current = config.settings.splitter.overlap_policy;
    if let Some(policy) = choose_setting(term, &t!("settings.overlap.title"), &choices, current)? {
        config.settings.splitter.overlap_policy = policy;
        save_settings(&config.settings)?;
        if let Some((_, label)) = choices.iter().find(|(p, _)| *p == policy) {
            announce_saved(label);
        }
    }

    Ok(())
}

fn show_scan_menu(term: &Term, config: &mut Config) -> Result<()> {
    let choices = [
        (true, t!("settings.scan.recursive").to_string()),
        (false, t!("settings.scan.top_level").to_string()),
    ];

    let current = config.settings.splitter.recursive_scan;
    if let Some(recursive) = choose_setting(term, &t!("settings.scan.title"), &choices, current)? {
        config.settings.splitter.recursive_scan = recursive;
        save_settings(&config.settings)?;
        if let Some((_, label)) = choices.iter().find(|(r, _)| *r == recursive) {
            announce_saved(label);
        }
    }

    Ok(())
}

fn show_preset_menu(term: &Term, config: &mut Config) -> Result<()> {
    let choices = [
        (
            EncodingPreset::Quality,
            format!("{} ({})", t!("settings.preset.quality"), EncodingPreset::Quality),
        ),
        (
            EncodingPreset::Fast,
            format!("{} ({})", t!("settings.preset.fast"), EncodingPreset::Fast),
        ),
    ];

    let current = config.settings.encoder.preset;
    if let Some(preset) = choose_setting(term, &t!("settings.preset.title"), &choices, current)? {
        config.settings.encoder.preset = preset;
        save_settings(&config.settings)?;
        announce_saved(&preset.to_string());
    }

    Ok(())
}

/// 語言設定選單
fn show_language_menu(term: &Term, config: &mut Config) -> Result<()> {
    let choices: Vec<(Language, String)> = [Language::EnUs, Language::ZhTw]
        .into_iter()
        .map(|l| (l, l.to_string()))
        .collect();

    let current = config.settings.language;
    if let Some(language) = choose_setting(term, &t!("settings.language.title"), &choices, current)? {
        config.settings.language = language;
        rust_i18n::set_locale(language.as_str());
        save_settings(&config.settings)?;
        announce_saved(&language.to_string());
    }

    Ok(())
}
