use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Deserialize;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct DateOption {
    label: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct DateOptionsResponse {
    default: String,
    options: Vec<DateOption>,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    time_slot: String,
    adults: u64,
    children: u64,
    total: u64,
    adult_revenue: String,
    child_revenue: String,
    total_revenue: String,
    highlight: bool,
}

#[derive(Debug, Deserialize)]
struct ChartSeries {
    name: String,
    values: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct ChartSpec {
    title: String,
    categories: Vec<String>,
    series: Vec<ChartSeries>,
}

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    state: String,
    filter: String,
    chart: Option<ChartSpec>,
    table: Vec<TableRow>,
    summary: String,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    records: usize,
}

const RECORDS: &str = r#"[
  {"data": "2025-06-01", "orario": "09:10", "descrizione": "Adult ticket"},
  {"data": "2025-06-01", "orario": "09:45", "descrizione": "Child ticket"},
  {"data": "2025-06-01", "orario": "09:50", "descrizione": "Child ticket"},
  {"data": "2025-06-02", "descrizione": "Biglietto bambino"},
  {"data": "2025-06-02", "orario": "17:35", "descrizione": "Biglietto intero"}
]"#;

struct TestServer {
    base_url: String,
    child: Child,
    data_path: Option<PathBuf>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        #[cfg(unix)]
        cleanup::forget(self.child.id());
        if let Some(path) = &self.data_path {
            let _ = std::fs::remove_file(path);
        }
    }
}

static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

// The shared server lives in a static and is never dropped, so its process and
// records file are released at exit instead.
#[cfg(unix)]
mod cleanup {
    use std::path::PathBuf;
    use std::sync::{Mutex, Once};

    static REGISTER: Once = Once::new();
    static PIDS: Mutex<Vec<u32>> = Mutex::new(Vec::new());
    static FILES: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

    fn install() {
        REGISTER.call_once(|| unsafe {
            libc::atexit(on_exit);
        });
    }

    pub fn register(pid: u32, data_path: Option<PathBuf>) {
        install();
        if let Ok(mut pids) = PIDS.lock() {
            pids.push(pid);
        }
        if let (Some(path), Ok(mut files)) = (data_path, FILES.lock()) {
            files.push(path);
        }
    }

    pub fn forget(pid: u32) {
        if let Ok(mut pids) = PIDS.lock() {
            pids.retain(|registered| *registered != pid);
        }
    }

    extern "C" fn on_exit() {
        if let Ok(pids) = PIDS.lock() {
            for pid in pids.iter() {
                unsafe {
                    libc::kill(*pid as i32, libc::SIGTERM);
                }
            }
        }
        if let Ok(files) = FILES.lock() {
            for path in files.iter() {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn write_records() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("visit_stats_http_{}_{}.json", std::process::id(), nanos));
    std::fs::write(&path, RECORDS).expect("write records");
    path
}

fn file_source(path: &Path) -> [(&'static str, String); 2] {
    [
        ("STATS_SOURCE", "file".to_string()),
        ("STATS_DATA_PATH", path.to_string_lossy().to_string()),
    ]
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/health")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server(envs: &[(&str, String)], data_path: Option<PathBuf>) -> TestServer {
    let port = pick_free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_visit_stats"))
        .env("PORT", port.to_string())
        .env("RUST_LOG", "info")
        .envs(envs.iter().map(|(key, value)| (*key, value.as_str())))
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id(), data_path.clone());

    let base_url = format!("http://127.0.0.1:{port}");
    let server = TestServer {
        base_url,
        child,
        data_path,
    };
    wait_until_ready(&server.base_url).await;
    server
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let path = write_records();
    let server = Arc::new(spawn_server(&file_source(&path), Some(path)).await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn analyze(server: &TestServer, date: &str) -> AnalysisResponse {
    Client::new()
        .post(format!("{}/api/analysis", server.base_url))
        .json(&serde_json::json!({ "date": date }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn http_dates_list_distinct_dates_then_all() {
    let server = shared_server().await;
    let dates: DateOptionsResponse = Client::new()
        .get(format!("{}/api/dates", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(dates.default, "all");
    let values: Vec<_> = dates.options.iter().map(|o| o.value.as_str()).collect();
    assert_eq!(values, vec!["2025-06-01", "2025-06-02", "all"]);
    assert_eq!(dates.options[2].label, "All data");
}

#[tokio::test]
async fn http_analysis_buckets_one_date() {
    let server = shared_server().await;
    let analysis = analyze(&server, "2025-06-01").await;

    assert_eq!(analysis.state, "analyzed");
    assert_eq!(analysis.filter, "2025-06-01");
    assert!(analysis.message.is_none());

    let chart = analysis.chart.expect("chart");
    assert_eq!(chart.title, "Customers per half hour (2025-06-01)");
    assert_eq!(chart.categories, vec!["09:00", "09:30"]);
    assert_eq!(chart.series[0].name, "Adults");
    assert_eq!(chart.series[0].values, vec![1, 0]);
    assert_eq!(chart.series[1].values, vec![0, 2]);

    assert_eq!(analysis.table.len(), 3);
    let total = &analysis.table[2];
    assert_eq!(total.time_slot, "TOTAL");
    assert!(total.highlight);
    assert_eq!((total.adults, total.children, total.total), (1, 2, 3));
    assert_eq!(total.adult_revenue, "3 €");
    assert_eq!(total.child_revenue, "4 €");
    assert_eq!(total.total_revenue, "7 €");
    assert!(!analysis.table[0].highlight);
    assert_eq!(
        analysis.summary,
        "Totals: adults=1, children=2, customers=3, revenue=7 €"
    );
}

#[tokio::test]
async fn http_analysis_all_dates_puts_missing_time_at_midnight() {
    let server = shared_server().await;
    let analysis = analyze(&server, "all").await;

    let slots: Vec<_> = analysis.table.iter().map(|row| row.time_slot.as_str()).collect();
    assert_eq!(slots, vec!["00:00", "09:00", "09:30", "17:30", "TOTAL"]);
    assert_eq!(analysis.table[0].children, 1);
    assert_eq!(analysis.table[4].total, 5);
}

#[tokio::test]
async fn http_analysis_unknown_date_reports_no_data() {
    let server = shared_server().await;
    let analysis = analyze(&server, "1999-12-31").await;

    assert_eq!(analysis.state, "analyzed");
    assert_eq!(
        analysis.message.as_deref(),
        Some("No data available for the selected date.")
    );
    assert!(analysis.chart.is_none());
    assert!(analysis.table.is_empty());
    assert!(analysis.summary.is_empty());
}

#[tokio::test]
async fn http_index_is_idle_until_triggered() {
    let server = shared_server().await;
    let client = Client::new();

    let idle = client
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(idle.contains(r#"data-state="idle""#));
    assert!(idle.contains(r#"<option value="all" selected>All data</option>"#));
    assert!(!idle.contains("Totals:"));

    let analyzed = client
        .post(format!("{}/analyze", server.base_url))
        .form(&[("date", "2025-06-02")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(analyzed.contains(r#"data-state="analyzed""#));
    assert!(analyzed.contains(r#"<option value="2025-06-02" selected>"#));
    assert!(analyzed.contains("Totals: adults=1, children=1, customers=2, revenue=5 €"));
    assert!(analyzed.contains(r#"<tr class="total">"#));
}

#[tokio::test]
async fn http_rejects_control_characters_in_date() {
    let server = shared_server().await;
    let response = Client::new()
        .post(format!("{}/api/analysis", server.base_url))
        .json(&serde_json::json!({ "date": "2025\u{0}06" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_unreachable_source_serves_empty_dashboard() {
    let envs = [
        ("STATS_SOURCE", "firestore".to_string()),
        ("FIRESTORE_PROJECT_ID", "shop".to_string()),
        ("FIRESTORE_BASE_URL", format!("http://127.0.0.1:{}", pick_free_port())),
    ];
    let server = spawn_server(&envs, None).await;
    let client = Client::new();

    let health: HealthResponse = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.records, 0);

    let dates: DateOptionsResponse = client
        .get(format!("{}/api/dates", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(dates.options.len(), 1);
    assert_eq!(dates.options[0].value, "all");

    let analysis = analyze(&server, "all").await;
    assert!(analysis.message.is_some());
    assert!(analysis.table.is_empty());
}

#[tokio::test]
async fn http_stopped_server_removes_its_records_file() {
    let path = write_records();
    let server = spawn_server(&file_source(&path), Some(path.clone())).await;

    let health: HealthResponse = Client::new()
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.records, 5);
    assert!(path.exists());

    drop(server);
    assert!(!path.exists());
}
