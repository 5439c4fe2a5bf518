use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber: workspace crates log at info, everything else
/// follows `RUST_LOG`.
pub fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    for directive in ["dashboard_service=info", "energy_client=info"] {
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
