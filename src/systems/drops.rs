//! Loot resolution.
//!
//! - [`drop_thread`] runs on its own OS thread and answers
//!   [`DropCmd::Resolve`] requests with [`DropResult`]s.
//! - [`apply_drop_results`] drains the answers each tick and places the loot,
//!   discarding answers for a map that is no longer loaded.
//!
//! See also: [`crate::resources::dropbridge`].

use bevy_ecs::prelude::*;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, info};

use crate::events::drop::{DropCmd, DropResult};
use crate::resources::dropbridge::{place_drop, DropBridge, DropResolver};
use crate::resources::objmanager::ObjManager;

/// Entry point of the drop resolver thread. Returns on
/// [`DropCmd::Shutdown`] or when the command channel closes.
pub fn drop_thread(
    mut resolver: Box<dyn DropResolver>,
    rx_cmd: Receiver<DropCmd>,
    tx_result: Sender<DropResult>,
) {
    while let Ok(cmd) = rx_cmd.recv() {
        match cmd {
            DropCmd::Resolve(request) => {
                let definition = resolver.resolve(&request);
                if tx_result
                    .send(DropResult {
                        request,
                        definition,
                    })
                    .is_err()
                {
                    break;
                }
            }
            DropCmd::Shutdown => break,
        }
    }
    info!(target: "drop", "drop resolver thread stopped");
}

/// Place every loot answer received since the last tick.
pub fn apply_drop_results(bridge: Option<Res<DropBridge>>, mut objs: ResMut<ObjManager>) {
    let Some(bridge) = bridge else {
        return;
    };
    for result in bridge.rx_result.try_iter() {
        let request = &result.request;
        if request.map_generation != objs.generation() {
            debug!(target: "drop", "stale loot for {} discarded", request.npc_name);
            continue;
        }
        let Some(template) = &result.definition else {
            continue;
        };
        let def = place_drop(request, template);
        if objs.add_obj(&def).is_some() {
            debug!(target: "drop", "{} dropped {}", request.npc_name, def.name);
        }
    }
}
