use std::thread;
use std::time::Duration;

use order_outbox::config::Settings;
use order_outbox::inventory::Product;
use order_outbox::order::Order;
use order_outbox::outbox::OutboxStore;
use order_outbox::pipeline::Pipeline;
use order_outbox::telemetry;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    telemetry::init_from_settings(&settings);

    let pipeline = Pipeline::builder().settings(&settings).start()?;

    for (id, name) in [("p1", "keyboard"), ("p2", "mouse"), ("p3", "monitor")] {
        pipeline.inventory().create(Product::new(id, name))?;
    }

    pipeline
        .orders()
        .create(Order::new("o1", "customer-1", ["p1", "p2"]))?;

    // Give the relay a few passes.
    for _ in 0..20 {
        if pipeline.outbox().list_pending()?.is_empty() {
            break;
        }
        thread::sleep(settings.relay.poll_interval().max(Duration::from_millis(50)));
    }

    let left: Vec<String> = pipeline
        .inventory()
        .list()?
        .into_iter()
        .map(|p| p.id)
        .collect();
    println!("inventory after order: {left:?}");

    let report = pipeline.shutdown();
    println!("relay: {:?}", report.relay);
    for (topic, stats) in &report.consumers {
        println!("{topic}: {stats:?}");
    }
    Ok(())
}
