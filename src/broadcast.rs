use tracing::{debug, warn};

use crate::{message::Message, registry::ClientRegistry};

/// Send `message` to every open client in the registry.
///
/// The message is encoded once. Clients whose channel is closed are skipped,
/// as are clients whose send fails; neither stops delivery to the rest.
/// Returns the number of clients the frame was queued for.
pub async fn broadcast(registry: &ClientRegistry, message: &Message) -> usize {
    let frame = match message.encode() {
        Ok(frame) => frame,
        Err(err) => {
            warn!("Error encoding broadcast message: {err}");
            return 0;
        }
    };

    let mut delivered = 0;
    for client in registry.snapshot().await {
        if !client.is_open() {
            debug!("Skipping closed client {}", client.id);
            continue;
        }
        match client.channel.send(frame.clone()) {
            Ok(()) => delivered += 1,
            Err(_) => debug!("Client {} went away during broadcast", client.id),
        }
    }
    delivered
}
