use std::rc::Rc;

use anyhow::ensure;
use virtualized_core::{Modifier, View, new_view_id};
use virtualized_ui::{HeadlessFeed, VirtualizedConfig, Window};
use web_time::Duration;

const ITEMS: usize = 200;
const VIEWPORT: (f32, f32) = (1280.0, 800.0);

/// Card heights vary so swaps actually move the page.
fn card(i: usize) -> Rc<dyn Fn() -> View> {
    let id = new_view_id();
    let title = new_view_id();
    let body = new_view_id();
    let height = 180.0 + (i % 7) as f32 * 60.0;
    Rc::new(move || {
        View::element(id, "article").with_children(vec![
            View::text(title, format!("Post #{}", i + 1)),
            View::element(body, "p").modifier(Modifier::new().height(height)),
        ])
    })
}

fn report(feed: &HeadlessFeed, label: &str) {
    log::info!(
        "{label}: scroll_y={:.0} doc={:.0} rendered={}/{}",
        feed.window().scroll_y(),
        feed.window().document_height(),
        feed.rendered_count(),
        feed.len()
    );
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    log::info!("Starting scroll feed demo ({ITEMS} items)");

    let mut feed = HeadlessFeed::new(VIEWPORT.0, VIEWPORT.1);
    let config = VirtualizedConfig::new()
        .visible_offset(400.0)
        .root_element("li", "feed-row");
    for i in 0..ITEMS {
        feed.push(config.clone(), card(i));
    }

    feed.pump();
    report(&feed, "mounted");
    feed.advance(Duration::from_millis(100));
    report(&feed, "settled");

    // A fling: many scroll events, one per frame, without pauses long enough
    // for visibility to settle.
    for step in 1..=60 {
        let y = feed.window().scroll_y() + 250.0;
        feed.scroll_to(y);
        feed.frame();
        feed.advance(Duration::from_millis(16));
        if step % 20 == 0 {
            report(&feed, &format!("fling step {step}"));
        }
    }
    feed.advance(Duration::from_millis(100));
    feed.frame();
    report(&feed, "fling settled");

    let compensations: u64 = feed.items().map(|i| i.stats().compensations).sum();
    let flips: u64 = feed.items().map(|i| i.stats().flips).sum();
    log::info!("compensations={compensations} flips={flips}");

    ensure!(
        feed.rendered_count() < ITEMS / 4,
        "virtualization kept {} of {ITEMS} items rendered",
        feed.rendered_count()
    );
    Ok(())
}
