//! Leptos DragDrop Utilities
//!
//! Mouse and keyboard reordering for board editors (block canvases and
//! widget grids). Uses a movement threshold to tell a click from a drag and
//! forwards every step to the [`Editor`], which owns the order and decides
//! when it is persisted.

use agency_board_lib::domain::{ItemId, Payload};
use agency_board_lib::editor::{DragSummary, Editor, SyncError, LEAVE_PROMPT};
use leptos::prelude::*;
use leptos::task::spawn_local;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{BeforeUnloadEvent, KeyboardEvent, MouseEvent};

/// DnD state signals
#[derive(Clone, Copy)]
pub struct DndSignals {
    pub dragging_id_read: ReadSignal<Option<ItemId>>,
    pub dragging_id_write: WriteSignal<Option<ItemId>>,
    /// Item currently hovered during a drag
    pub over_id_read: ReadSignal<Option<ItemId>>,
    pub over_id_write: WriteSignal<Option<ItemId>>,
    pub drag_just_ended_read: ReadSignal<bool>,
    pub drag_just_ended_write: WriteSignal<bool>,
    /// Pending item id (mousedown but not yet dragging)
    pub pending_id_read: ReadSignal<Option<ItemId>>,
    pub pending_id_write: WriteSignal<Option<ItemId>>,
    /// Start position for movement detection
    pub start_x_read: ReadSignal<i32>,
    pub start_x_write: WriteSignal<i32>,
    pub start_y_read: ReadSignal<i32>,
    pub start_y_write: WriteSignal<i32>,
    /// Bumped whenever the editor's order changed; views re-read `items()` on it
    pub version_read: ReadSignal<u64>,
    pub version_write: WriteSignal<u64>,
}

/// Movement threshold in pixels to start dragging
const DRAG_THRESHOLD_PX: i32 = 5;

pub fn create_dnd_signals() -> DndSignals {
    let (dragging_id_read, dragging_id_write) = signal(None::<ItemId>);
    let (over_id_read, over_id_write) = signal(None::<ItemId>);
    let (drag_just_ended_read, drag_just_ended_write) = signal(false);
    let (pending_id_read, pending_id_write) = signal(None::<ItemId>);
    let (start_x_read, start_x_write) = signal(0i32);
    let (start_y_read, start_y_write) = signal(0i32);
    let (version_read, version_write) = signal(0u64);
    DndSignals {
        dragging_id_read,
        dragging_id_write,
        over_id_read,
        over_id_write,
        drag_just_ended_read,
        drag_just_ended_write,
        pending_id_read,
        pending_id_write,
        start_x_read,
        start_x_write,
        start_y_read,
        start_y_write,
        version_read,
        version_write,
    }
}

fn bump(dnd: &DndSignals) {
    dnd.version_write.update(|v| *v += 1);
}

/// End drag operation
pub fn end_drag(dnd: &DndSignals) {
    dnd.dragging_id_write.set(None);
    dnd.over_id_write.set(None);
    dnd.pending_id_write.set(None);
    dnd.drag_just_ended_write.set(true);

    if let Some(win) = web_sys::window() {
        let clear = dnd.drag_just_ended_write;
        let cb = Closure::<dyn FnMut()>::new(move || {
            clear.set(false);
        });
        let _ = win.set_timeout_with_callback_and_timeout_and_arguments_0(
            cb.as_ref().unchecked_ref(),
            100,
        );
        cb.forget();
    }
}

fn is_text_input(target: Option<web_sys::EventTarget>) -> bool {
    target.is_some_and(|t| {
        t.dyn_ref::<web_sys::HtmlInputElement>().is_some()
            || t.dyn_ref::<web_sys::HtmlTextAreaElement>().is_some()
    })
}

/// Create mousedown handler for draggable items
/// Records pending drag with start position
pub fn make_on_mousedown(
    dnd: DndSignals,
    item_id: ItemId,
) -> impl Fn(MouseEvent) + Clone + 'static {
    move |ev: MouseEvent| {
        if ev.button() != 0 {
            return;
        }
        // Ignore editing fields and buttons inside the item
        let target = ev.target();
        if is_text_input(target.clone()) {
            return;
        }
        if target.is_some_and(|t| t.dyn_ref::<web_sys::HtmlButtonElement>().is_some()) {
            return;
        }
        dnd.pending_id_write.set(Some(item_id.clone()));
        dnd.start_x_write.set(ev.client_x());
        dnd.start_y_write.set(ev.client_y());
    }
}

/// Document mousemove: starts the editor drag once moved past the threshold
pub fn bind_global_mousemove<P: Payload>(dnd: DndSignals, editor: Editor<P>) {
    let on_mousemove = Closure::<dyn FnMut(MouseEvent)>::new(move |ev: MouseEvent| {
        let Some(pending) = dnd.pending_id_read.get_untracked() else {
            return;
        };
        if dnd.dragging_id_read.get_untracked().is_some() {
            return;
        }

        let dx = (ev.client_x() - dnd.start_x_read.get_untracked()).abs();
        let dy = (ev.client_y() - dnd.start_y_read.get_untracked()).abs();
        if dx > DRAG_THRESHOLD_PX || dy > DRAG_THRESHOLD_PX {
            if editor.drag_start(&pending) {
                dnd.dragging_id_write.set(Some(pending));
            } else {
                dnd.pending_id_write.set(None);
            }
        }
    });

    if let Some(doc) = web_sys::window().and_then(|win| win.document()) {
        let _ = doc
            .add_event_listener_with_callback("mousemove", on_mousemove.as_ref().unchecked_ref());
    }
    on_mousemove.forget();
}

/// Create mouseenter handler for items: the dragged item moves live into this slot
pub fn make_on_item_mouseenter<P: Payload>(
    dnd: DndSignals,
    editor: Editor<P>,
    item_id: ItemId,
) -> impl Fn(MouseEvent) + Clone + 'static {
    move |_ev: MouseEvent| {
        let Some(dragging) = dnd.dragging_id_read.get_untracked() else {
            return;
        };
        // Don't allow dropping on self
        if dragging == item_id {
            return;
        }
        dnd.over_id_write.set(Some(item_id.clone()));
        if editor.drag_over(&item_id) {
            bump(&dnd);
        }
    }
}

/// Create mouseleave handler
pub fn make_on_mouseleave(dnd: DndSignals) -> impl Fn(MouseEvent) + Copy + 'static {
    move |_ev: MouseEvent| {
        if dnd.dragging_id_read.get_untracked().is_some() {
            dnd.over_id_write.set(None);
        }
    }
}

/// Bind global mouseup handler that finishes the drag.
///
/// `on_done` receives the result of persisting the new order (immediate
/// policy) or `Ok` right away (deferred policy).
pub fn bind_global_mouseup<P, F>(dnd: DndSignals, editor: Editor<P>, on_done: F)
where
    P: Payload,
    F: Fn(Result<Option<DragSummary>, SyncError>) + Clone + 'static,
{
    let drop_editor = editor.clone();
    let on_mouseup = Closure::<dyn FnMut(MouseEvent)>::new(move |_ev: MouseEvent| {
        let was_dragging = dnd.dragging_id_read.get_untracked().is_some();

        // Clear pending state first
        dnd.pending_id_write.set(None);
        end_drag(&dnd);

        // Not dragging: the click event fires naturally on the element
        if !was_dragging {
            return;
        }

        let editor = drop_editor.clone();
        let on_done = on_done.clone();
        spawn_local(async move {
            let result = editor.drag_end().await;
            if let Err(err) = &result {
                log::warn!("drop on {} not saved: {}", editor.owner(), err);
            }
            // A failed persist may have reverted the order
            bump(&dnd);
            on_done(result);
        });
    });

    if let Some(doc) = web_sys::window().and_then(|win| win.document()) {
        let _ =
            doc.add_event_listener_with_callback("mouseup", on_mouseup.as_ref().unchecked_ref());
    }
    on_mouseup.forget();

    // Also bind global mousemove
    bind_global_mousemove(dnd, editor);
}

/// Escape aborts a running drag and puts the items back
pub fn bind_escape_cancel<P: Payload>(dnd: DndSignals, editor: Editor<P>) {
    let on_keydown = Closure::<dyn FnMut(KeyboardEvent)>::new(move |ev: KeyboardEvent| {
        if ev.key() != "Escape" || dnd.dragging_id_read.get_untracked().is_none() {
            return;
        }
        if editor.drag_cancel() {
            bump(&dnd);
        }
        end_drag(&dnd);
    });

    if let Some(doc) = web_sys::window().and_then(|win| win.document()) {
        let _ =
            doc.add_event_listener_with_callback("keydown", on_keydown.as_ref().unchecked_ref());
    }
    on_keydown.forget();
}

/// Create keydown handler for an item: Alt+ArrowUp / Alt+ArrowDown move it one slot
pub fn make_on_item_keydown<P, F>(
    dnd: DndSignals,
    editor: Editor<P>,
    item_id: ItemId,
    on_done: F,
) -> impl Fn(KeyboardEvent) + Clone + 'static
where
    P: Payload,
    F: Fn(Result<bool, SyncError>) + Clone + 'static,
{
    move |ev: KeyboardEvent| {
        if !ev.alt_key() || is_text_input(ev.target()) {
            return;
        }
        let up = match ev.key().as_str() {
            "ArrowUp" => true,
            "ArrowDown" => false,
            _ => return,
        };
        ev.prevent_default();

        let editor = editor.clone();
        let item_id = item_id.clone();
        let on_done = on_done.clone();
        spawn_local(async move {
            let result = if up {
                editor.move_up(&item_id).await
            } else {
                editor.move_down(&item_id).await
            };
            bump(&dnd);
            on_done(result);
        });
    }
}

/// Ask before the window closes while the editor holds unsaved changes
pub fn bind_unsaved_guard<P: Payload>(editor: Editor<P>) {
    let guard = editor.guard();
    let on_beforeunload = Closure::<dyn FnMut(BeforeUnloadEvent)>::new(
        move |ev: BeforeUnloadEvent| {
            if guard.should_intercept() {
                ev.prevent_default();
                ev.set_return_value(LEAVE_PROMPT);
            }
        },
    );

    if let Some(win) = web_sys::window() {
        let _ = win.add_event_listener_with_callback(
            "beforeunload",
            on_beforeunload.as_ref().unchecked_ref(),
        );
    }
    on_beforeunload.forget();
}
