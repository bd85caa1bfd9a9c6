//! Progress bar driven by run events.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use testscope_core::{Event, StateStore};

pub struct RunProgress {
    bar: ProgressBar,
}

impl RunProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] {bar:30} {pos}/{len} {wide_msg}")
        {
            bar.set_style(style);
        }
        Self { bar }
    }

    /// Observer that advances the bar once per finished request.
    pub fn observer(&self) -> impl FnMut(&Event, &StateStore) + Send + 'static {
        let bar = self.bar.clone();
        move |event: &Event, store: &StateStore| match event {
            Event::RunCompleted { .. } => {
                bar.inc(1);
                let summary = store.summary();
                bar.set_message(format!("{} passed, {} failed", summary.passed, summary.failed));
            }
            Event::Result(result) if !result.passed => {
                bar.println(format!("FAIL {}", result.name));
            }
            _ => {}
        }
    }

    pub fn start(&self, requests: usize) {
        self.bar.set_length(requests as u64);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
