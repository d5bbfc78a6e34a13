use std::cmp::min;
use std::fmt::Write;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use stampede_core::prelude::DelegatedShutdownListener;

const REFRESH_INTERVAL: Duration = Duration::from_millis(250);

/// Displays a progress bar while the test is running to show the user how long is left.
///
/// The bar is cleared once the shutdown signal is seen. Join the returned handle so the terminal
/// is tidy before the summary is printed.
pub(crate) fn start_progress(
    planned_runtime: Duration,
    shutdown_listener: DelegatedShutdownListener,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("progress".to_string())
        .spawn(move || {
            let start_time = Instant::now();
            let pb = ProgressBar::new(planned_runtime.as_secs());
            pb.set_style(progress_style(planned_runtime));

            loop {
                if shutdown_listener.should_shutdown() {
                    log::trace!("Progress thread shutting down");
                    pb.finish_and_clear();
                    break;
                }

                let new = min(start_time.elapsed().as_secs(), planned_runtime.as_secs());
                pb.set_position(new);
                std::thread::sleep(REFRESH_INTERVAL);
            }
        })
}

fn progress_style(planned_runtime: Duration) -> ProgressStyle {
    let style = match ProgressStyle::with_template(
        "{spinner:.green} [{wide_bar:.cyan/blue}] [{elapsed_precise} / {planned_runtime}]",
    ) {
        Ok(style) => style,
        Err(e) => {
            log::warn!("Falling back to the default progress style: {e}");
            return ProgressStyle::default_bar();
        }
    };

    let hours = planned_runtime.as_secs() / 3600;
    let minutes = (planned_runtime.as_secs() % 3600) / 60;
    let seconds = planned_runtime.as_secs() % 60;
    style
        .with_key(
            "planned_runtime",
            move |_state: &ProgressState, w: &mut dyn Write| {
                let _ = write!(w, "{:02}:{:02}:{:02}", hours, minutes, seconds);
            },
        )
        .progress_chars("#>-")
}
