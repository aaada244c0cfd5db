//! Headless walkthrough of the kalends navigation engine: opens an overlay,
//! replays a keyboard session, and prints what the rendering shell would
//! observe.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use kalends::{
    CalendarDate, KeyPress, MaterializedWindow, NavKey, NavigatorArgs, OverlayArgsBuilder,
    OverlayContent, ScrollFinished, ScrollFinishedCallback, SelectionCallback,
    WindowChangedCallback, Weekday, disabled_dates_fn,
};

const FRAME: Duration = Duration::from_millis(16);

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    tracing::info!("starting kalends walkthrough");

    let overlay = OverlayContent::new(
        OverlayArgsBuilder::default()
            .navigator(
                NavigatorArgs::default()
                    .min_date(CalendarDate::new(2010, 1, 1).unwrap())
                    .max_date(CalendarDate::new(2012, 12, 31).unwrap())
                    .initial_position(CalendarDate::new(2010, 5, 17).unwrap())
                    // Weekends are disabled; arrows may still land on them.
                    .disabled_dates(disabled_dates_fn(|date| {
                        matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday)
                    }))
                    .scroll_duration(Duration::from_millis(200)),
            )
            .on_scroll_finished(Arc::new(|finished: ScrollFinished| {
                println!(
                    "scroll finished at {:.2} (was {:.2})",
                    finished.position, finished.old_position
                );
            }) as ScrollFinishedCallback)
            .on_window_changed(Arc::new(|window: MaterializedWindow| {
                println!(
                    "materialized months {}..={} (+{} / -{})",
                    window.range.0,
                    window.range.1,
                    window.added.len(),
                    window.released.len()
                );
            }) as WindowChangedCallback)
            .on_selection(Arc::new(|date, valid| match date {
                Some(date) if valid => println!("selected {date}"),
                Some(date) => println!("rejected {date}"),
                None => println!("selection cleared"),
            }) as SelectionCallback)
            .build()
            .expect("builder construction failed"),
    );

    let mut now = Instant::now();
    overlay.open(now);
    println!("opened, focus on {:?}", overlay.focused_date().map(|d| d.to_string()));

    let script = [
        KeyPress::plain(NavKey::ArrowRight),
        KeyPress::plain(NavKey::ArrowDown),
        KeyPress::plain(NavKey::PageDown),
        KeyPress::shifted(NavKey::PageDown),
        KeyPress::plain(NavKey::End),
        KeyPress::plain(NavKey::Enter),
    ];

    for press in script {
        if !overlay.is_open() {
            break;
        }
        overlay.handle_key(press, now);
        println!(
            "{:?}{} -> focus {:?}",
            press.key,
            if press.shift { "+shift" } else { "" },
            overlay.focused_date().map(|d| d.to_string())
        );
        // Let any reveal animation run to completion.
        for _ in 0..30 {
            now += FRAME;
            overlay.on_frame(now);
        }
    }

    println!("value: {:?}", overlay.value());
}
