mod bubbles;
mod characters;
mod settings;
#[cfg(test)]
mod testing;
mod utils;
mod widget;

use std::{path::PathBuf, sync::Arc};

use settings::SettingsStore;
use tauri::{Manager, RunEvent};
use widget::{
    commands::{
        apply_settings, begin_drag, delete_note, drag_to, end_drag, get_memo_text,
        get_widget_view, host_character_selected, host_chat_changed, host_persona_updated,
        host_set_thumbnail_template, host_settings_updated, host_sync_directory, migrate_note,
        report_viewport, reset_global_captions, resize_panel, toggle_ignore_click, update_memo,
    },
    TauriUi, WidgetController,
};

pub(crate) struct AppState {
    pub(crate) widget: WidgetController,
    pub(crate) settings: SettingsStore,
}

fn debug_requested() -> bool {
    std::env::var("POPUPMEMO_DEBUG")
        .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true"))
        .unwrap_or(false)
}

fn settings_path(app_data_dir: PathBuf) -> PathBuf {
    match std::env::var_os("POPUPMEMO_SETTINGS") {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => app_data_dir.join("settings.json"),
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // RUST_LOG still wins over the default filter.
    let default_level = if debug_requested() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    log::info!("Popup memo starting up...");

    let app = tauri::Builder::default()
        .setup(|app| {
            let result = (|| -> anyhow::Result<()> {
                let app_data_dir = app
                    .path()
                    .app_data_dir()
                    .map_err(|err| anyhow::anyhow!(err))?;

                let path = settings_path(app_data_dir);
                log::info!("Settings file: {}", path.display());
                let settings_store = SettingsStore::open(path);

                let ui = Arc::new(TauriUi::new(app.handle().clone()));
                let widget = WidgetController::new(settings_store.clone(), ui);

                app.manage(AppState {
                    widget: widget.clone(),
                    settings: settings_store,
                });

                tauri::async_runtime::spawn(async move {
                    widget.initialize().await;
                });

                Ok(())
            })();

            result.map_err(|err| err.into())
        })
        .invoke_handler(tauri::generate_handler![
            get_widget_view,
            host_character_selected,
            host_chat_changed,
            host_sync_directory,
            host_persona_updated,
            host_settings_updated,
            host_set_thumbnail_template,
            update_memo,
            toggle_ignore_click,
            apply_settings,
            reset_global_captions,
            delete_note,
            migrate_note,
            get_memo_text,
            begin_drag,
            drag_to,
            end_drag,
            resize_panel,
            report_viewport,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|app_handle, event| {
        if let RunEvent::Exit = event {
            if let Some(state) = app_handle.try_state::<AppState>() {
                if let Err(err) = state.settings.flush() {
                    log::error!("Failed to flush settings on exit: {err:#}");
                }
            }
        }
    });
}
