use tabled::Tabled;

#[derive(Tabled)]
pub struct RequestRow {
    pub request: String,
    pub count: u64,
    pub failures: u64,
    #[tabled(display = "float2")]
    pub avg_time_ms: f64,
    #[tabled(display = "float2")]
    pub min_time_ms: f64,
    #[tabled(display = "float2")]
    pub p50_ms: f64,
    #[tabled(display = "float2")]
    pub p90_ms: f64,
    #[tabled(display = "float2")]
    pub p95_ms: f64,
    #[tabled(display = "float2")]
    pub p99_ms: f64,
    #[tabled(display = "float2")]
    pub max_time_ms: f64,
}

fn float2(n: &f64) -> String {
    format!("{:.2}", n)
}
