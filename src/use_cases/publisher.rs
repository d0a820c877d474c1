// Snapshot publishing: copies the authoritative store into watch channels readers can poll.

use crate::domain::{DeviceState, EntityState, ScreenState, World};
use crate::use_cases::context::RunContext;
use crate::use_cases::store::Store;
use crate::use_cases::types::{RunStatus, Snapshot};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Read surface for renderers: one watch channel per domain plus the run status.
#[derive(Debug)]
pub struct Publisher {
    device: watch::Sender<Snapshot<DeviceState>>,
    entity: watch::Sender<Snapshot<EntityState>>,
    screen: watch::Sender<Snapshot<ScreenState>>,
    status: watch::Sender<RunStatus>,
    frames: AtomicU64,
}

impl Publisher {
    pub fn new(initial: &World) -> Self {
        let (device, _) = watch::channel(snapshot(0, false, initial.device.clone()));
        let (entity, _) = watch::channel(snapshot(0, false, initial.entity.clone()));
        let (screen, _) = watch::channel(snapshot(0, false, initial.screen.clone()));
        let (status, _) = watch::channel(RunStatus::idle(0));
        Self {
            device,
            entity,
            screen,
            status,
            frames: AtomicU64::new(0),
        }
    }

    /// Publishes a copy of `world` and returns its frame number.
    pub fn publish(&self, world: World, live: bool) -> u64 {
        let frame = self.frames.fetch_add(1, Ordering::AcqRel) + 1;
        self.device
            .send_replace(snapshot(frame, live, world.device));
        self.entity
            .send_replace(snapshot(frame, live, world.entity));
        self.screen
            .send_replace(snapshot(frame, live, world.screen));
        frame
    }

    /// Copies the store under one lock, then publishes outside of it.
    pub fn publish_store(&self, store: &Store, live: bool) -> u64 {
        self.publish(store.copy(), live)
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn set_status(&self, status: RunStatus) {
        self.status.send_replace(status);
    }

    pub fn update_status(&self, f: impl FnOnce(&mut RunStatus)) {
        self.status.send_modify(f);
    }

    pub fn status(&self) -> watch::Receiver<RunStatus> {
        self.status.subscribe()
    }

    pub fn device(&self) -> watch::Receiver<Snapshot<DeviceState>> {
        self.device.subscribe()
    }

    pub fn entity(&self) -> watch::Receiver<Snapshot<EntityState>> {
        self.entity.subscribe()
    }

    pub fn screen(&self) -> watch::Receiver<Snapshot<ScreenState>> {
        self.screen.subscribe()
    }
}

fn snapshot<T>(frame: u64, live: bool, state: T) -> Snapshot<T> {
    Snapshot { frame, live, state }
}

/// Periodic publisher for the duration of one run.
pub async fn publisher_task(ctx: Arc<RunContext>) {
    let mut interval = tokio::time::interval(ctx.settings.publish_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut stop = ctx.stop_signal();
    let mut published: u64 = 0;

    loop {
        tokio::select! {
            _ = stop.wait_for(|stopped| *stopped) => break,
            _ = interval.tick() => {}
        }

        if ctx.publish_live().is_none() {
            break;
        }
        published += 1;
    }

    debug!(published, "publisher exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_copies_every_domain_with_a_new_frame() {
        let mut world = World::default();
        let publisher = Publisher::new(&world);
        let entity_rx = publisher.entity();
        let screen_rx = publisher.screen();

        world.entity.score = 12;
        world.screen.title = "Counter".into();
        let frame = publisher.publish(world, true);

        assert_eq!(frame, 1);
        assert_eq!(entity_rx.borrow().state.score, 12);
        assert_eq!(screen_rx.borrow().state.title, "Counter");
        assert!(screen_rx.borrow().live);
    }

    #[test]
    fn snapshot_is_detached_from_the_store() {
        let store = Store::default();
        let publisher = Publisher::new(&store.copy());
        publisher.publish_store(&store, false);

        store.write(|w| w.entity.score = 99);

        assert_eq!(publisher.entity().borrow().state.score, 0);
    }
}
