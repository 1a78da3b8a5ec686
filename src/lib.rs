use {
    crate::{
        config::{Config, InputEntry, Plan},
        error::ReadError,
        sensors::{DynSensor, Measurement},
    },
    anyhow::{anyhow, Result},
    log::{debug, error, info, warn},
    rumqttc::{AsyncClient, MqttOptions, QoS},
    std::{
        collections::HashMap,
        env,
        sync::{Arc, Mutex, PoisonError},
        time::Duration,
    },
    tokio::{task, time::interval},
};

pub mod bus;
pub mod config;
pub mod devices;
pub mod error;
pub mod registry;
pub mod schema;
pub mod sensors;

const DEFAULT_CONFIG_PATH: &str = "config.yml";

// inputs reading the same module take turns on one driver
type SharedSensor = Arc<Mutex<Box<dyn DynSensor>>>;

pub async fn client() -> Result<()> {
    pretty_env_logger::init();
    color_backtrace::install();

    let path = env::args()
        .nth(1)
        .or_else(|| env::var("CONFIG_PATH").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    info!("Loading config from {}", path);

    let mut config = Config::from_path(&path)?;
    config.mqtt.apply_env(|key| env::var(key).ok())?;
    let plan = config.validate()?;

    let mqtt = &config.mqtt;
    info!("MQTT connecting to {}:{}", mqtt.host, mqtt.port);
    let (client, mut eventloop) = {
        let mut mqttoptions = MqttOptions::new(mqtt.client_id(), mqtt.host.clone(), mqtt.port);
        mqttoptions.set_keep_alive(Duration::from_secs(mqtt.keep_alive));

        AsyncClient::new(mqttoptions, 10)
    };

    let sensors = setup_modules(&plan);
    if sensors.is_empty() && !plan.modules.is_empty() {
        return Err(anyhow!("No sensor module could be set up"));
    }

    for input in plan.inputs {
        match sensors.get(&input.module) {
            Some(sensor) => {
                info!("Polling {} every {:?}", input.name, input.interval);
                let topic = sensor_topic(mqtt.topic_prefix(), &input.name);
                task::spawn(poll(input, sensor.clone(), client.clone(), topic));
            }
            None => {
                warn!(
                    "Not polling {}: module {} is not available",
                    input.name, input.module
                );
            }
        }
    }

    info!("Initialization complete");

    loop {
        eventloop.poll().await?;
    }
}

fn setup_modules(plan: &Plan) -> HashMap<String, SharedSensor> {
    let mut sensors = HashMap::new();

    for entry in &plan.modules {
        match (entry.module.setup)(&entry.bus, &entry.config) {
            Ok(sensor) => {
                info!(
                    "Set up {} module {} on {}",
                    entry.module.name, entry.name, entry.bus
                );
                sensors.insert(entry.name.clone(), Arc::new(Mutex::new(sensor)));
            }
            Err(e) => {
                warn!("Disabling module {}: {}", entry.name, e);
            }
        }
    }

    sensors
}

fn sensor_topic(prefix: &str, name: &str) -> String {
    format!("{}/sensor/{}", prefix, name)
}

#[derive(Debug, PartialEq)]
enum Action {
    Publish(String),
    Skip,
    Stop,
}

fn action(input: &InputEntry, reading: Result<Measurement, ReadError>) -> Action {
    match reading {
        Ok(measurement) => match measurement.format(input.digits) {
            Some(payload) => Action::Publish(payload),
            None => {
                warn!("{} reported no {} value", input.name, input.kind);
                Action::Skip
            }
        },
        Err(e) if e.is_retryable() => {
            warn!("{}", e);
            Action::Skip
        }
        Err(e) => {
            error!("{}", e);
            Action::Stop
        }
    }
}

async fn poll(input: InputEntry, sensor: SharedSensor, client: AsyncClient, topic: String) {
    let mut interval = interval(input.interval);
    loop {
        interval.tick().await;

        let reading = {
            let sensor = sensor.clone();
            let name = input.name.clone();
            let kind = input.kind.clone();
            task::spawn_blocking(move || {
                sensor
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .dispatch(&name, &kind)
            })
            .await
        };
        let reading = match reading {
            Ok(reading) => reading,
            Err(e) => {
                error!("Reading {} panicked: {}", input.name, e);
                return;
            }
        };

        match action(&input, reading) {
            Action::Publish(payload) => {
                debug!("{} = {}", topic, payload);
                if let Err(e) = client
                    .publish(topic.as_str(), QoS::AtLeastOnce, false, payload)
                    .await
                {
                    error!("Failed to publish {}: {}", topic, e);
                    return;
                }
            }
            Action::Skip => {}
            Action::Stop => return,
        }
    }
}
