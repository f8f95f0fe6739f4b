mod peer;

use anyhow::Result;
use carsync::{PacketLossSimulation, RoleFacts, SimulatedLink, SyncConfig, SyncEvent};
use clap::Parser;
use glam::Vec3;
use rapier3d::prelude::Vector;

use peer::Peer;

const VEHICLE_ID: u32 = 1;

#[derive(Parser)]
#[command(name = "carsync-sim")]
#[command(about = "Drives a vehicle on one peer and replays it on others over a lossy link")]
struct Args {
    #[arg(short, long, default_value_t = 8.0, help = "Simulated seconds")]
    duration: f32,

    #[arg(long, default_value_t = 3.0, help = "Seconds the owner keeps driving")]
    drive_time: f32,

    #[arg(long, default_value_t = 1.0, help = "Seconds between braking and sleeping")]
    settle_time: f32,

    #[arg(long, default_value_t = 8.0, help = "Driving speed in m/s")]
    speed: f32,

    #[arg(long, help = "Route states through a relaying server peer")]
    relay: bool,

    #[arg(long, default_value_t = 0.0, help = "Packet loss percentage (0-100)")]
    loss_percent: f32,

    #[arg(long, default_value_t = 0, help = "Minimum latency in ms")]
    min_latency: u32,

    #[arg(long, default_value_t = 0, help = "Maximum latency in ms")]
    max_latency: u32,

    #[arg(long, default_value_t = 0, help = "Jitter in ms")]
    jitter: u32,

    #[arg(long, default_value_t = 1)]
    seed: u64,

    #[arg(long, help = "Override net_send_rate (seconds)")]
    send_rate: Option<f32>,

    #[arg(long, help = "Override net_time_behind (seconds)")]
    time_behind: Option<f32>,

    #[arg(long, help = "Override net_lerp_start (seconds)")]
    lerp_start: Option<f32>,

    #[arg(long, help = "Override net_smoothing")]
    smoothing: Option<f32>,
}

impl Args {
    fn sync_config(&self) -> SyncConfig {
        let defaults = SyncConfig::default();
        SyncConfig {
            net_send_rate: self.send_rate.unwrap_or(defaults.net_send_rate),
            net_time_behind: self.time_behind.unwrap_or(defaults.net_time_behind),
            net_lerp_start: self.lerp_start.unwrap_or(defaults.net_lerp_start),
            net_smoothing: self.smoothing.unwrap_or(defaults.net_smoothing),
            ..defaults
        }
    }

    fn link_conditions(&self) -> PacketLossSimulation {
        PacketLossSimulation {
            enabled: self.loss_percent > 0.0 || self.max_latency > 0 || self.jitter > 0,
            loss_percent: self.loss_percent,
            min_latency_ms: self.min_latency,
            max_latency_ms: self.max_latency,
            jitter_ms: self.jitter,
        }
    }
}

#[derive(Debug, Default)]
struct Report {
    samples: u32,
    error_sum: f32,
    max_error: f32,
    teleports: u32,
    rest_changes: u32,
    owner_changes: u32,
}

impl Report {
    fn record(&mut self, error: f32) {
        self.samples += 1;
        self.error_sum += error;
        self.max_error = self.max_error.max(error);
    }

    fn record_events(&mut self, events: impl Iterator<Item = SyncEvent>) {
        for event in events {
            match event {
                SyncEvent::Teleported => self.teleports += 1,
                SyncEvent::RestChanged { .. } => self.rest_changes += 1,
                SyncEvent::OwnerChanged => self.owner_changes += 1,
                SyncEvent::RoleChanged { .. } => {}
            }
        }
    }

    fn mean_error(&self) -> f32 {
        if self.samples == 0 {
            return 0.0;
        }
        self.error_sum / self.samples as f32
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.sync_config();
    let spawn = Vec3::new(0.0, 1.0, 0.0);

    let mut owner = Peer::spawn(
        "owner",
        spawn,
        config.clone(),
        RoleFacts {
            locally_controlled: true,
            player_controlled: true,
            ..Default::default()
        },
    )?;
    let mut server = Peer::spawn(
        "server",
        spawn,
        config.clone(),
        RoleFacts {
            is_server: true,
            player_controlled: true,
            has_authority: true,
            ..Default::default()
        },
    )?;
    let mut observer = Peer::spawn("observer", spawn, config, RoleFacts::default())?;

    let mut uplink = SimulatedLink::new(args.link_conditions(), args.seed);
    let mut downlink = SimulatedLink::new(args.link_conditions(), args.seed.wrapping_add(1));

    log::info!(
        "simulating {:.1}s, {} route, loss {}%, latency {}-{}ms",
        args.duration,
        if args.relay { "relayed" } else { "direct" },
        args.loss_percent,
        args.min_latency,
        args.max_latency
    );

    let dt = owner.world.dt();
    let frames = (args.duration / dt).ceil() as u32;
    let brake_at = f64::from(args.drive_time);
    let sleep_at = brake_at + f64::from(args.settle_time);
    let mut report = Report::default();

    for frame in 0..frames {
        let now = f64::from(frame) * f64::from(dt);

        let braking = now >= brake_at;
        let speed = if braking { 0.0 } else { args.speed };
        owner.rig.set_wheels_locked(braking);
        owner.rig.hold_locked_wheels(&mut owner.world);
        owner.world.step_with(|chassis, _| {
            let vy = chassis.linvel().y;
            chassis.set_linvel(Vector::new(speed, vy, 0.0), true);
        });
        if now >= sleep_at {
            owner.world.sleep_body(owner.rig.chassis);
        }

        owner.publish(now, dt);
        owner.flush(&mut uplink, VEHICLE_ID, now)?;

        for packet in uplink.take_ready(now) {
            if args.relay {
                server.relay(packet.payload, now);
            } else {
                observer.receive(packet.payload, now);
            }
        }

        if args.relay {
            server.play_back(now, dt);
            server.world.step();
            server.flush(&mut downlink, VEHICLE_ID, now)?;
            for packet in downlink.take_ready(now) {
                observer.receive(packet.payload, now);
            }
            server.sync.drain_events().for_each(drop);
        }

        observer.play_back(now, dt);
        observer.world.step();
        report.record_events(observer.sync.drain_events());

        if let (Some(truth), Some(replica)) = (owner.transform(), observer.transform()) {
            report.record(replica.planar_distance(&truth));
        }
    }

    let final_error = match (owner.transform(), observer.transform()) {
        (Some(truth), Some(replica)) => replica.planar_distance(&truth),
        _ => f32::NAN,
    };

    let mut links = vec![("uplink", uplink.stats().clone(), uplink.in_flight())];
    if args.relay {
        links.push(("downlink", downlink.stats().clone(), downlink.in_flight()));
    }

    println!("frames:          {}", frames);
    println!(
        "physics step:    {:.2} ms",
        owner.world.last_step_delta() * 1000.0
    );
    for (name, stats, in_flight) in links {
        println!(
            "{:<16} sent {} delivered {} lost {} in flight {} ({} bytes)",
            format!("{name}:"),
            stats.packets_sent,
            stats.packets_delivered,
            stats.packets_lost,
            in_flight,
            stats.bytes_sent
        );
    }
    println!("mean error:      {:.3} m", report.mean_error());
    println!("max error:       {:.3} m", report.max_error);
    println!("final error:     {:.3} m", final_error);
    println!("teleports:       {}", report.teleports);
    println!("rest changes:    {}", report.rest_changes);
    println!("owner changes:   {}", report.owner_changes);
    println!("observer rests:  {}", observer.sync.rest_state().resting);
    println!("owner locked:    {} wheels", owner.rig.locked_wheels());
    println!(
        "owner states:    {} sent, {} rest transitions",
        owner.sync.tracker().states_sent(),
        owner.sync.tracker().transitions_sent()
    );

    Ok(())
}
