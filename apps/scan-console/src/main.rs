//! # Barcoder Scan Console
//!
//! Terminal stand-in for the mobile scanner screen.
//!
//! ## Session
//! ```text
//! $ scan-console --variant catalog
//! [camera] point the camera at a barcode
//! > ean13:7791234567890
//! Searching for 7791234567890...
//!   1. Yerba Mate 1kg                               $1.234,50
//!      https://articulo.mercadolibre.com.ar/MLA-1
//! > again
//! [camera] point the camera at a barcode
//! > quit
//! ```
//!
//! ## Commands
//! - `<symbology>:<payload>` - a decoded barcode (`ean13:...`, `qr:...`)
//! - `again` - "scan again"
//! - `grant` - manual permission retry (also lifts `--deny-camera`)
//! - `refresh` - re-read the permission without prompting
//! - `blur` - the decoder failed to read a frame
//! - `status` - print a JSON status snapshot
//! - `quit` - unmount the screen and exit

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

use barcoder_core::{NumberLocale, PermissionState, ScanEvent, ScreenView, SessionState, Symbology};
use barcoder_scan::{
    CaptureDevice, CatalogClient, PermissionGate, PermissionHost, ScanController, ScanResult,
    ScannerConfig, ScreenVariant, SessionObserver,
};

#[derive(Parser, Debug)]
#[command(
    name = "scan-console",
    version,
    about = "Scan barcodes from the terminal and look them up in the product catalog",
    after_help = "Type `ean13:7791234567890`, `qr:https://example.com`, `again`, `grant`, `status` or `quit`."
)]
struct Args {
    /// Path to scanner.toml (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Screen variant: catalog | raw
    #[arg(long)]
    variant: Option<String>,

    /// Answer the first permission prompt with "deny"
    #[arg(long)]
    deny_camera: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config =
        ScannerConfig::load(args.config.clone()).context("Failed to load scanner config")?;
    if let Some(variant) = &args.variant {
        config.scanner.variant = variant.parse::<ScreenVariant>()?;
    }

    info!(
        variant = %config.variant(),
        catalog = %config.catalog.base_url,
        locale = %config.locale(),
        "Starting scan console"
    );

    let host = Arc::new(ConsolePermissionHost::new(args.deny_camera));
    let lookup = Arc::new(CatalogClient::from_config(&config)?);
    let controller = ScanController::from_config(
        &config,
        PermissionGate::new(host.clone()),
        Arc::new(ConsoleCamera::default()),
        lookup,
    )
    .observer(Arc::new(PrintObserver {
        locale: config.locale(),
    }))
    .build();

    controller.activate().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end_matches(['\r', '\n']);
        match line.trim() {
            "" => continue,
            "quit" | "exit" => break,
            "again" => {
                controller.scan_again();
            }
            "grant" => {
                host.allow();
                controller.grant_permission().await;
            }
            "refresh" => {
                controller.refresh_permission().await;
            }
            "blur" => {
                controller.report_decode_error("unreadable frame");
            }
            "status" => {
                println!("{}", serde_json::to_string_pretty(&controller.status())?);
            }
            command => match parse_scan(line) {
                Some(event) => {
                    controller.handle_scan(event).await;
                }
                None => println!("Unrecognized input: {}", command),
            },
        }
    }

    controller.deactivate();
    info!("Scan console finished");
    Ok(())
}

/// Initializes tracing to stderr, leaving stdout for the screen.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,barcoder=debug,reqwest=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .with_writer(std::io::stderr)
        .init();
}

/// Parses `<symbology>:<payload>`. The payload keeps its whitespace.
fn parse_scan(line: &str) -> Option<ScanEvent> {
    let (symbology, payload) = line.split_once(':')?;
    let symbology = symbology.trim().parse::<Symbology>().ok()?;
    Some(ScanEvent::new(symbology, payload))
}

// =============================================================================
// Host Collaborators
// =============================================================================

/// Permission prompt answered by the `--deny-camera` flag.
struct ConsolePermissionHost {
    denied: AtomicBool,
}

impl ConsolePermissionHost {
    fn new(deny: bool) -> Self {
        ConsolePermissionHost {
            denied: AtomicBool::new(deny),
        }
    }

    fn allow(&self) {
        self.denied.store(false, Ordering::SeqCst);
    }

    fn answer(&self) -> PermissionState {
        if self.denied.load(Ordering::SeqCst) {
            PermissionState::Denied
        } else {
            PermissionState::Granted
        }
    }
}

#[async_trait]
impl PermissionHost for ConsolePermissionHost {
    async fn query(&self) -> ScanResult<PermissionState> {
        Ok(self.answer())
    }

    async fn request(&self) -> ScanResult<PermissionState> {
        Ok(self.answer())
    }
}

#[derive(Default)]
struct ConsoleCamera {
    running: AtomicBool,
}

impl CaptureDevice for ConsoleCamera {
    fn start(&self) -> ScanResult<()> {
        self.running.store(true, Ordering::SeqCst);
        debug!("Console camera on");
        Ok(())
    }

    fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            debug!("Console camera off");
        }
    }
}

// =============================================================================
// Rendering
// =============================================================================

struct PrintObserver {
    locale: NumberLocale,
}

impl SessionObserver for PrintObserver {
    fn on_view(&self, view: &ScreenView) {
        println!("{}", render(view, self.locale));
    }
}

fn render(view: &ScreenView, locale: NumberLocale) -> String {
    let session = match view {
        ScreenView::RequestingPermission => return "[camera] requesting permission...".into(),
        ScreenView::PermissionDenied => {
            return "[camera] access denied. Type `grant` to try again.".into()
        }
        ScreenView::Scanning { session } => session,
    };

    match session {
        SessionState::Idle => "[camera] point the camera at a barcode".into(),
        SessionState::Searching { payload } => format!("Searching for {}...", payload),
        SessionState::Results { products, .. } => products
            .iter()
            .enumerate()
            .map(|(i, p)| {
                format!(
                    "{:>3}. {:<40} {:>14}\n     {}",
                    i + 1,
                    p.title,
                    p.price.display(locale),
                    p.permalink
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
        SessionState::Empty { payload } => {
            format!("No products found for {}. Type `again` to scan another.", payload)
        }
        SessionState::Failed {
            payload,
            error_kind,
        } if error_kind.is_lookup_failure() => format!(
            "{} [{}] Type `again` to retry {}.",
            error_kind.user_message(),
            error_kind.code(),
            payload
        ),
        SessionState::Failed { error_kind, .. } => {
            format!("{} [{}]", error_kind.user_message(), error_kind.code())
        }
        SessionState::Decoded { payload, symbology } => format!("{}: {}", symbology, payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barcoder_core::{FailureKind, Money, Price, Product};

    #[test]
    fn test_parse_scan() {
        let event = parse_scan("ean13:7791234567890").unwrap();
        assert_eq!(event.symbology, Symbology::Ean13);
        assert_eq!(event.payload, "7791234567890");

        let event = parse_scan("qr:https://example.com/a:b").unwrap();
        assert_eq!(event.symbology, Symbology::Qr);
        assert_eq!(event.payload, "https://example.com/a:b");

        assert!(parse_scan("again").is_none());
        assert!(parse_scan("hologram:123").is_none());
    }

    #[test]
    fn test_render_results() {
        let product = Product::try_new(
            "MLA1",
            "Yerba Mate 1kg",
            Price::new(Money::from_cents(123_450), "ARS"),
            "http://img/1.jpg",
            "http://item/1",
        )
        .unwrap();
        let view = ScreenView::Scanning {
            session: SessionState::Results {
                payload: "7791234567890".into(),
                products: vec![product],
            },
        };

        let text = render(&view, NumberLocale::EsAr);
        assert!(text.contains("Yerba Mate 1kg"));
        assert!(text.contains("$1.234,50"));
        assert!(text.contains("http://item/1"));
    }

    #[test]
    fn test_render_failure_uses_shared_message() {
        let view = ScreenView::Scanning {
            session: SessionState::Failed {
                payload: "1".into(),
                error_kind: FailureKind::Timeout,
            },
        };
        let text = render(&view, NumberLocale::EnUs);
        assert!(text.starts_with("Search failed"));
        assert!(text.contains("retry 1."));
    }

    #[test]
    fn test_render_camera_failure_has_no_retry_hint() {
        let view = ScreenView::Scanning {
            session: SessionState::Failed {
                payload: String::new(),
                error_kind: FailureKind::CameraUnavailable,
            },
        };
        let text = render(&view, NumberLocale::EnUs);
        assert_eq!(
            text,
            format!(
                "{} [{}]",
                FailureKind::CameraUnavailable.user_message(),
                FailureKind::CameraUnavailable.code()
            )
        );
        assert!(!text.contains("again"));
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["scan-console", "--variant", "raw", "--deny-camera"]);
        assert_eq!(args.variant.as_deref(), Some("raw"));
        assert!(args.deny_camera);
        assert!(args.config.is_none());
    }
}
