use host::{HostRegistry, ModuleStatusReporter};
use instance::PduInstance;
use settings::Settings;
use status::StatusReconciler;

mod commander;
mod host;
mod instance;
mod pdu;
mod poller;
mod settings;
mod status;

#[tokio::main(flavor = "multi_thread")]
pub async fn main() {
    let settings = Settings::new().expect("Error reading configuration");

    settings
        .monitoring()
        .init()
        .expect("Error initializing monitoring");

    let module_status = ModuleStatusReporter::new();

    let mut instance = PduInstance::init(
        &settings.pdu,
        &settings.polling,
        settings.verbose,
        StatusReconciler::new(),
        module_status.clone(),
    );
    let (registry, registry_runner) = HostRegistry::new(instance.status_reader());

    let http_server_exec = {
        let commander = instance.commander();
        let http_server = settings.http_server.clone();

        async move {
            http_server
                .run_server(move || {
                    vec![host::new_routes(
                        registry.clone(),
                        module_status.clone(),
                        commander.clone(),
                    )]
                })
                .await
                .expect("HTTP server execution failed");
        }
    };

    tracing::info!("Starting main loop");

    tokio::select!(
        _ = registry_runner.run() => {},
        _ = http_server_exec => {},
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal");
        },
    );

    if instance.is_polling() {
        tracing::info!("Stopping PDU polling");
    }
    instance.destroy();
    tracing::info!("Stopped");
}
