#![allow(non_snake_case)]
use tether_core::prelude::*;

struct Chat {
    room: Signal<String>,
    messages: Signal<Vec<String>>,
}

// Logs new messages while mounted; resubscribes whenever the room changes.
fn RoomView(chat: &Chat) {
    let room = chat.room.get();
    let messages = chat.messages.clone();

    use_disposable(room.clone(), move || {
        log::info!("joined {room}");
        let feed = reaction(
            {
                let messages = messages.clone();
                move || messages.with(|m| m.len())
            },
            {
                let room = room.clone();
                move |count: &usize| {
                    let last = messages.with(|m| m.last().cloned().unwrap_or_default());
                    log::info!("[{room}] #{count}: {last}");
                }
            },
        );
        on_unmount(move || {
            feed.run();
            log::info!("left {room}");
        })
    });
}

fn post(chat: &Chat, text: &str) {
    chat.messages.update(|m| m.push(text.to_string()));
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let chat = Chat {
        room: signal("lobby".to_string()),
        messages: signal(Vec::new()),
    };

    let mut comp = Composition::new();
    comp.compose(|| RoomView(&chat));
    post(&chat, "hello");

    comp.compose(|| RoomView(&chat));
    chat.room.set("kitchen".to_string());
    comp.compose(|| RoomView(&chat));
    post(&chat, "anyone here?");

    comp.dispose();
    post(&chat, "nobody is listening");

    // The same lifecycle driven by hand, without a composition.
    let mut binder = DisposableBinder::new();
    binder.activate(chat.room.get(), || {
        chat.messages.watch(|m| log::info!("raw watch: {} message(s)", m.len()))
    })?;
    post(&chat, "seen by the raw watcher");
    binder.dispose();
    post(&chat, "not seen");

    Ok(())
}
