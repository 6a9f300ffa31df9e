use tauri::State;

use crate::AppState;

use super::{
    geometry::{Pointer, PointerTarget, Rect, Viewport},
    host::HostSync,
    view::{SettingsPatch, WidgetView},
    WidgetController,
};
use crate::settings::Position;

fn controller_from_state(state: &State<'_, AppState>) -> WidgetController {
    state.widget.clone()
}

#[tauri::command]
pub async fn get_widget_view(state: State<'_, AppState>) -> Result<WidgetView, String> {
    let controller = controller_from_state(&state);
    Ok(controller.current_view().await)
}

// Host lifecycle

#[tauri::command]
pub async fn host_character_selected(
    state: State<'_, AppState>,
    sync: HostSync,
) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller.on_character_selected(sync).await;
    Ok(())
}

#[tauri::command]
pub async fn host_chat_changed(state: State<'_, AppState>, sync: HostSync) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller.on_chat_changed(sync).await;
    Ok(())
}

#[tauri::command]
pub async fn host_sync_directory(
    state: State<'_, AppState>,
    sync: HostSync,
) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller.sync_host(sync).await;
    Ok(())
}

#[tauri::command]
pub async fn host_persona_updated(
    state: State<'_, AppState>,
    persona_avatar: Option<String>,
) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller.on_persona_updated(persona_avatar).await;
    Ok(())
}

#[tauri::command]
pub async fn host_settings_updated(state: State<'_, AppState>) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller.on_settings_updated().await;
    Ok(())
}

#[tauri::command]
pub async fn host_set_thumbnail_template(
    state: State<'_, AppState>,
    template: Option<String>,
) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller.set_thumbnail_template(template).await;
    Ok(())
}

// Panel edits

#[tauri::command]
pub async fn update_memo(
    state: State<'_, AppState>,
    character_key: Option<String>,
    text: String,
) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller.update_memo(character_key, text).await;
    Ok(())
}

#[tauri::command]
pub async fn toggle_ignore_click(state: State<'_, AppState>) -> Result<bool, String> {
    let controller = controller_from_state(&state);
    Ok(controller.toggle_ignore_click().await)
}

#[tauri::command]
pub async fn apply_settings(
    state: State<'_, AppState>,
    patch: SettingsPatch,
) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller.apply_settings(patch).await;
    Ok(())
}

#[tauri::command]
pub async fn reset_global_captions(
    state: State<'_, AppState>,
    confirmed: bool,
) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller
        .reset_global_captions(confirmed)
        .await
        .map_err(|e| e.to_string())
}

// Saved notes

#[tauri::command]
pub async fn delete_note(
    state: State<'_, AppState>,
    key: String,
    confirmed: bool,
) -> Result<bool, String> {
    let controller = controller_from_state(&state);
    controller
        .delete_note(&key, confirmed)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn migrate_note(
    state: State<'_, AppState>,
    from: String,
    to: String,
    confirmed: bool,
) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller
        .migrate_note(&from, &to, confirmed)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_memo_text(state: State<'_, AppState>, key: String) -> Result<String, String> {
    let controller = controller_from_state(&state);
    controller
        .memo_text(&key)
        .await
        .ok_or_else(|| format!("No memo stored for '{key}'"))
}

// Geometry

#[tauri::command]
pub async fn begin_drag(
    state: State<'_, AppState>,
    pointer: Pointer,
    target: PointerTarget,
) -> Result<bool, String> {
    let controller = controller_from_state(&state);
    Ok(controller.begin_drag(pointer, target).await)
}

#[tauri::command]
pub async fn drag_to(
    state: State<'_, AppState>,
    pointer: Pointer,
) -> Result<Option<Position>, String> {
    let controller = controller_from_state(&state);
    Ok(controller.drag_to(pointer).await)
}

#[tauri::command]
pub async fn end_drag(state: State<'_, AppState>) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller.end_drag().await;
    Ok(())
}

#[tauri::command]
pub async fn resize_panel(
    state: State<'_, AppState>,
    width: f64,
    height: f64,
) -> Result<bool, String> {
    let controller = controller_from_state(&state);
    Ok(controller.resize(width, height).await)
}

#[tauri::command]
pub async fn report_viewport(
    state: State<'_, AppState>,
    viewport: Viewport,
    chat_container: Option<Rect>,
) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller.report_viewport(viewport, chat_container).await;
    Ok(())
}
