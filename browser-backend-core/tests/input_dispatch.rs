use std::sync::Arc;
use std::time::Duration;

use browser_backend_core::{
    EventProxy, HeadlessSurface, ManualClock, MessageQueue, ModifierKeys, PeerHandler, PeerId, PeerStack, Point,
    PointF, Rect, RgbaImage,
};
use parking_lot::Mutex;

type Presses = Arc<Mutex<Vec<(&'static str, PointF)>>>;

struct NamedHandler {
    name: &'static str,
    presses: Presses,
}

impl PeerHandler for NamedHandler {
    fn mouse(&mut self, position: PointF, modifiers: ModifierKeys, _time: i64) {
        if modifiers.is_any_mouse_button_down() {
            self.presses.lock().push((self.name, position));
        }
    }

    fn paint(&mut self, area: Rect) -> Option<RgbaImage> {
        Some(RgbaImage {
            width: area.width as u32,
            height: area.height as u32,
            pixels: vec![0xff; (area.width * area.height * 4) as usize],
        })
    }
}

fn proxy() -> (EventProxy, HeadlessSurface) {
    let surface = HeadlessSurface::new(1024, 768);
    let queue = Arc::new(MessageQueue::new());
    let clock = ManualClock::new().as_clock();
    let stack = PeerStack::new(
        Box::new(surface.clone()),
        Arc::clone(&queue),
        Arc::clone(&clock),
        Duration::from_millis(8),
    );
    (EventProxy::new(queue, stack, clock), surface)
}

fn add(proxy: &mut EventProxy, name: &'static str, bounds: Rect, presses: &Presses) -> PeerId {
    let handler = NamedHandler {
        name,
        presses: Arc::clone(presses),
    };
    proxy.stack_mut().create_peer(bounds, Box::new(handler)).unwrap()
}

#[test]
fn press_outside_all_peers_is_ignored() {
    let (mut proxy, _surface) = proxy();
    let presses = Presses::default();
    add(&mut proxy, "a", Rect::new(0, 0, 100, 100), &presses);
    add(&mut proxy, "b", Rect::new(150, 0, 100, 100), &presses);

    let sender = proxy.sender();
    sender.mouse("down", 120, 50, 0, false, false, false, 0);
    sender.mouse("down", 100, 100, 0, false, false, false, 0);
    proxy.dispatch_pending();

    assert!(presses.lock().is_empty());
}

#[test]
fn overlapping_press_goes_to_the_top_peer_only() {
    let (mut proxy, _surface) = proxy();
    let presses = Presses::default();
    let back = add(&mut proxy, "back", Rect::new(0, 0, 200, 200), &presses);
    let front = add(&mut proxy, "front", Rect::new(50, 50, 100, 100), &presses);

    let sender = proxy.sender();
    sender.mouse("down", 60, 70, 0, false, false, false, 0);
    proxy.dispatch_pending();
    assert_eq!(*presses.lock(), vec![("front", PointF::new(10.0, 20.0))]);

    // Raising the back peer flips who wins.
    proxy.stack_mut().to_front(&back, true).unwrap();
    sender.mouse("down", 60, 70, 0, false, false, false, 0);
    proxy.dispatch_pending();
    assert_eq!(presses.lock().last(), Some(&("back", PointF::new(60.0, 70.0))));
    assert_eq!(proxy.stack().peer_at(Point::new(60, 70)), Some(&back));
    assert_ne!(proxy.stack().peer_at(Point::new(60, 70)), Some(&front));
}

#[test]
fn hidden_peers_are_skipped() {
    let (mut proxy, _surface) = proxy();
    let presses = Presses::default();
    add(&mut proxy, "back", Rect::new(0, 0, 200, 200), &presses);
    let front = add(&mut proxy, "front", Rect::new(0, 0, 200, 200), &presses);
    proxy.stack_mut().set_visible(&front, false).unwrap();

    proxy.sender().mouse("down", 10, 10, 0, false, false, false, 0);
    proxy.dispatch_pending();
    assert_eq!(*presses.lock(), vec![("back", PointF::new(10.0, 10.0))]);
}

#[test]
fn repaints_are_dispatched_through_the_same_queue() {
    let (mut proxy, surface) = proxy();
    let presses = Presses::default();
    let id = add(&mut proxy, "a", Rect::new(0, 0, 64, 64), &presses);

    proxy.stack_mut().repaint(&id, Rect::new(0, 0, 32, 32)).unwrap();
    proxy.stack_mut().repaint(&id, Rect::new(32, 32, 32, 32)).unwrap();
    assert_eq!(proxy.dispatch_pending(), 1);

    let record = surface.record(&id).unwrap();
    assert_eq!(record.blits, vec![Rect::new(0, 0, 32, 32), Rect::new(32, 32, 32, 32)]);
    assert!(!proxy.stack().peer(&id).unwrap().has_pending_repaints());
}
