use crate::{error::ConfigError, photon::Category};

/// Size and density estimation parameters of one photon map
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapSettings {
    /// Photons to store before the map stops accepting new ones, 0 disables the map
    pub target_size: usize,
    /// Largest distance at which photons are gathered
    pub estimation_radius: f32,
    /// Photons used by a single density estimate
    pub estimation_size: usize,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            target_size: 100_000,
            estimation_radius: 1.0,
            estimation_size: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhotonMapperConfig {
    /// Settings of each map, indexed by [Category::index]
    pub maps: [MapSettings; 3],
    /// Photons shot at most, whatever the map sizes
    pub max_photons: usize,
    /// Gather rays per diffuse camera hit, 0 queries the global map directly
    pub final_gather_rays: u32,
    /// Fraction of global photons carrying a precomputed irradiance, which
    /// is also the probability that a gather ray uses it
    pub precomputed_irradiance_ratio: f32,
    /// Sample the lights explicitly instead of reading direct light from the global map
    pub direct_lighting: bool,
    pub light_samples: u32,
    /// Multiplier of the caustic map target size
    pub caustics_quality: u32,
    /// Longest specular chain followed from the camera, and longest photon path
    pub max_depth: u32,
    /// Ray marching steps across the medium
    pub volume_steps: u32,
    /// Show the raw global density estimate at the first hit
    pub visualize_photon_map: bool,
    /// Photons traced by a parallel batch of the emission phase
    pub batch_size: usize,
}

impl Default for PhotonMapperConfig {
    fn default() -> Self {
        Self {
            maps: [MapSettings::default(); 3],
            max_photons: 1_000_000,
            final_gather_rays: 0,
            precomputed_irradiance_ratio: 0.25,
            direct_lighting: true,
            light_samples: 1,
            caustics_quality: 1,
            max_depth: 8,
            volume_steps: 16,
            visualize_photon_map: false,
            batch_size: 16_384,
        }
    }
}

impl PhotonMapperConfig {
    pub fn map(&self, category: Category) -> &MapSettings {
        &self.maps[category.index()]
    }

    pub fn map_mut(&mut self, category: Category) -> &mut MapSettings {
        &mut self.maps[category.index()]
    }

    /// Requested size of a map once the caustics quality is applied
    pub fn target_size(&self, category: Category) -> usize {
        let target = self.map(category).target_size;
        match category {
            Category::Caustic => target.saturating_mul(self.caustics_quality as usize),
            _ => target,
        }
    }

    pub fn with_map(mut self, category: Category, settings: MapSettings) -> Self {
        *self.map_mut(category) = settings;
        self
    }

    pub fn with_max_photons(mut self, max_photons: usize) -> Self {
        self.max_photons = max_photons;
        self
    }

    pub fn with_final_gather(mut self, rays: u32, precomputed_irradiance_ratio: f32) -> Self {
        self.final_gather_rays = rays;
        self.precomputed_irradiance_ratio = precomputed_irradiance_ratio;
        self
    }

    pub fn with_direct_lighting(mut self, direct_lighting: bool) -> Self {
        self.direct_lighting = direct_lighting;
        self
    }

    pub fn with_visualization(mut self, visualize_photon_map: bool) -> Self {
        self.visualize_photon_map = visualize_photon_map;
        self
    }

    /// Check every knob, the first invalid one is reported
    pub fn validate(&self) -> Result<(), ConfigError> {
        for category in Category::ALL {
            let map = self.map(category);
            if !(map.estimation_radius.is_finite() && map.estimation_radius > 0.0) {
                return Err(ConfigError::invalid(
                    "estimation_radius",
                    map.estimation_radius,
                    "must be a positive finite distance",
                ));
            }
            if map.target_size > 0 && map.estimation_size == 0 {
                return Err(ConfigError::invalid(
                    "estimation_size",
                    map.estimation_size,
                    "an enabled map needs at least one photon per estimate",
                ));
            }
        }
        if self.max_photons == 0 {
            return Err(ConfigError::invalid(
                "max_photons",
                self.max_photons,
                "must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.precomputed_irradiance_ratio) {
            return Err(ConfigError::invalid(
                "precomputed_irradiance_ratio",
                self.precomputed_irradiance_ratio,
                "must lie in [0, 1]",
            ));
        }
        if self.caustics_quality == 0 {
            return Err(ConfigError::invalid(
                "caustics_quality",
                self.caustics_quality,
                "must be at least 1",
            ));
        }
        if self.volume_steps == 0 {
            return Err(ConfigError::invalid(
                "volume_steps",
                self.volume_steps,
                "must be at least 1",
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::invalid(
                "batch_size",
                self.batch_size,
                "must be positive",
            ));
        }
        Ok(())
    }
}
