use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use lucis::{engine::Tile, output::Sink, renderer::PixelRenderResult};
use rand::{distributions::Alphanumeric, Rng};
use tev_client::{PacketCreateImage, PacketUpdateImage, TevClient};

/// Channels of a [PixelRenderResult], in memory order
const CHANNEL_NAMES: [&str; 10] = [
    "R", "G", "B", "albedo.X", "albedo.Y", "albedo.Z", "normal.X", "normal.Y", "normal.Z", "z",
];

/// Live preview in the tev image viewer
pub struct TevSink {
    client: TevClient,
    image_name: String,
    opened: bool,
    resolution: (u32, u32),
}

impl TevSink {
    pub fn new(tev_path: Option<String>, tev_hostname: Option<String>) -> Result<Self> {
        let tev_hostname: String = tev_hostname.unwrap_or("127.0.0.1:14158".into());
        let tev_path: String = tev_path.unwrap_or("./tev".into());

        let try_spawn = |path: PathBuf| -> Result<()> {
            let mut command = std::process::Command::new(path);
            command.arg(format!("--hostname={tev_hostname}"));
            command
                .stdout(std::process::Stdio::null())
                .stdin(std::process::Stdio::null())
                .spawn()?;

            // Leave tev some time to listen
            std::thread::sleep(std::time::Duration::from_secs(2));
            Ok(())
        };
        let try_connect = || -> Result<TevClient> {
            Ok(TevClient::wrap(std::net::TcpStream::connect(&tev_hostname)?))
        };

        log::debug!("Trying tev direct connection");
        let client = match try_connect() {
            Ok(client) => client,
            Err(_) => {
                log::warn!("Can't find tev, trying to spawn it");
                try_spawn(tev_path.into())?;
                try_connect().context("connecting to the spawned tev")?
            }
        };
        log::info!("Successfully connected to tev");

        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(7)
            .map(char::from)
            .collect();

        Ok(Self {
            client,
            image_name: format!("lucis-{id}"),
            opened: false,
            resolution: (0, 0),
        })
    }
}

impl Sink for TevSink {
    fn name(&self) -> &str {
        "tev"
    }

    fn begin_render(&mut self, resolution: (u32, u32)) -> Result<()> {
        if self.opened && self.resolution == resolution {
            return Ok(());
        }
        self.resolution = resolution;
        self.client.send(PacketCreateImage {
            image_name: &self.image_name,
            grab_focus: true,
            channel_names: &CHANNEL_NAMES,
            width: resolution.0,
            height: resolution.1,
        })?;
        self.opened = true;
        Ok(())
    }

    fn write_region(&mut self, tile: &Tile, pixels: &[PixelRenderResult]) -> Result<()> {
        if pixels.is_empty() {
            return Ok(());
        }
        ensure!(pixels.len() == tile.len(), "region {tile:?} has {} pixels", pixels.len());

        let channel_offsets: Vec<u64> = (0..CHANNEL_NAMES.len() as u64).collect();
        let channel_strides = vec![CHANNEL_NAMES.len() as u64; CHANNEL_NAMES.len()];

        self.client
            .send(PacketUpdateImage {
                image_name: &self.image_name,
                grab_focus: false,
                channel_names: &CHANNEL_NAMES,
                channel_offsets: &channel_offsets,
                channel_strides: &channel_strides,
                x: tile.x_start,
                y: tile.y_start,
                width: tile.width() as u32,
                height: tile.height() as u32,
                data: bytemuck::cast_slice(pixels),
            })
            .context("Can't send Packet to tev client. It may be closed")
    }
}
