// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated scroll session that exercises scheduling and diagnostics.
//!
//! Feeds 180 synthetic frames (scroll down, pause, scroll back up, resize)
//! into a [`ViewportProvider`] with a handful of listeners of varying cost and
//! priority. Every round is captured by a
//! [`RecorderSink`](lookout_debug::recorder::RecorderSink), replayed through a
//! [`PrettyPrintSink`](lookout_debug::pretty::PrettyPrintSink), and exported
//! as Chrome trace JSON. An
//! [`InspectorPort`](lookout_debug::inspector::InspectorPort) receives the
//! stats bridge's updates.
//!
//! Usage: `dispatch_demo [TRACE_JSON] [CONFIG_JSON]`. Set `RUST_LOG=debug` to
//! see subscription and bridge logging.

use std::fs::File;
use std::io::BufWriter;
use std::rc::Rc;

use tracing_subscriber::EnvFilter;

use lookout_core::bridge::{ManualIdleScheduler, PortId};
use lookout_core::clock::ManualClock;
use lookout_core::collector::RawMeasurement;
use lookout_core::time::HostTime;
use lookout_core::trace::Tracer;
use lookout_core::{
    Dimensions, Handler, ListenerOptions, Priority, SchedulerConfig, Viewport, ViewportProvider,
};

use lookout_debug::inspector::InspectorPort;
use lookout_debug::pretty::PrettyPrintSink;
use lookout_debug::recorder::{RecorderSink, replay};

const FRAME_COUNT: u32 = 180;
const FRAME_MS: f64 = 16.0;
/// Frames between idle opportunities.
const IDLE_EVERY: u32 = 30;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let trace_path = args.next().unwrap_or_else(|| "dispatch_trace.json".to_owned());
    let config = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path).expect("failed to read config");
            SchedulerConfig::from_json(&json).expect("invalid scheduler config")
        }
        None => SchedulerConfig::adaptive(),
    };
    tracing::info!(?config, "starting simulated session");

    // -- provider ----------------------------------------------------------
    let clock = ManualClock::starting_at(HostTime::from_millis_f64(1_000.0));
    let idle = ManualIdleScheduler::new();
    let provider = ViewportProvider::builder()
        .config(config)
        .clock(clock.clone())
        .stats_bridge(idle.clone())
        .initial_measurement(measurement(0.0, false))
        .build();

    let inspector = Rc::new(InspectorPort::new());
    if let Some(bridge) = provider.bridge() {
        bridge.connect(PortId(1), inspector.clone());
    }

    subscribe_listeners(&provider, &clock);

    // -- simulated loop ----------------------------------------------------
    let mut recorder = RecorderSink::new();
    for frame in 0..FRAME_COUNT {
        clock.advance_millis(FRAME_MS);
        let raw = measurement(scroll_position(frame), frame >= 150);
        provider.on_frame_traced(raw, &mut Tracer::new(&mut recorder));

        if frame % IDLE_EVERY == IDLE_EVERY - 1 {
            provider.on_idle_traced(&mut Tracer::new(&mut recorder));
            idle.run_idle();
        }
    }

    // -- report ------------------------------------------------------------
    let mut pretty = PrettyPrintSink::new(Box::new(std::io::stdout()));
    replay(recorder.events(), &mut pretty);

    let rounds = recorder.summaries().count();
    let skipped: usize = recorder.summaries().map(|s| s.skipped).sum();
    println!();
    println!("{rounds} rounds, {skipped} skipped notifications");
    println!(
        "{:<16} {:>8} {:>6} {:>6} {:>9} {:>9}",
        "listener", "priority", "runs", "skips", "avg ms", "max ms"
    );
    for s in inspector.latest().unwrap_or_default() {
        println!(
            "{:<16} {:>8} {:>6} {:>6} {:>9.2} {:>9.2}",
            s.display_name.as_deref().unwrap_or("?"),
            s.priority.as_str(),
            s.iterations,
            s.total_skipped_iterations,
            s.average_execution_cost,
            s.max_execution_cost,
        );
    }
    println!("inspector received {} updates", inspector.len());

    // -- export Chrome trace -----------------------------------------------
    let file = File::create(&trace_path).expect("failed to create trace file");
    let mut writer = BufWriter::new(file);
    lookout_debug::chrome::export(recorder.events(), &mut writer)
        .expect("failed to write Chrome trace");
    println!("Wrote {trace_path} ({FRAME_COUNT} frames)");
}

/// Registers listeners whose handlers "cost" time by advancing the clock.
fn subscribe_listeners(provider: &ViewportProvider, clock: &ManualClock) {
    let costly = |ms: f64| {
        let c = clock.clone();
        Handler::from_viewport(move |_| c.advance_millis(ms))
    };

    provider.subscribe(
        costly(0.3),
        ListenerOptions::scroll()
            .with_priority(Priority::High)
            .with_display_name("sticky-header"),
    );
    provider.subscribe(
        costly(12.0),
        ListenerOptions::viewport()
            .with_priority(Priority::Low)
            .with_display_name("parallax"),
    );
    provider.subscribe(
        costly(4.0),
        ListenerOptions::dimensions()
            .with_priority(Priority::Highest)
            .with_display_name("grid-reflow"),
    );
    provider.subscribe(
        costly(0.5),
        ListenerOptions::scroll()
            .defer_update_until_idle()
            .with_display_name("lazy-images"),
    );

    let c = clock.clone();
    let layout_clock = clock.clone();
    provider.subscribe(
        Handler::with_layout(move |_, progress: Option<&f64>| {
            if progress.is_some() {
                c.advance_millis(2.0);
            }
        }),
        ListenerOptions::layout_snapshot(move |v: &Viewport| {
            layout_clock.advance_millis(1.0);
            let scrollable = v.dimensions.document_height - v.dimensions.height;
            if scrollable > 0.0 { v.scroll.y / scrollable } else { 0.0 }
        })
        .with_display_name("read-progress"),
    );
}

/// Scrolls down for 60 frames, rests, then scrolls back up.
fn scroll_position(frame: u32) -> f64 {
    let f = f64::from(frame);
    match frame {
        0..60 => f * 40.0,
        60..90 => 2_400.0,
        90..150 => 2_400.0 - (f - 90.0) * 40.0,
        _ => 0.0,
    }
}

fn measurement(scroll_y: f64, resized: bool) -> RawMeasurement {
    let (width, height) = if resized { (1024.0, 700.0) } else { (1280.0, 800.0) };
    RawMeasurement {
        scroll_x: 0.0,
        scroll_y,
        dimensions: Dimensions {
            width,
            height,
            client_width: width - 15.0,
            client_height: height,
            outer_width: width,
            outer_height: height + 80.0,
            document_width: width - 15.0,
            document_height: 3_200.0,
        },
    }
}
