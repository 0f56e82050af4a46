// The engine: a lattice of GPU-resident particles advanced by one or two
// vector fields and drawn as point sprites.
use std::time::Instant;

use rand::Rng;

use crate::draw_pass::{Destination, DrawPass};
use crate::field_params::{FieldParams, ParamOverrides};
use crate::init_pass::{InitPass, WeightRange};
use crate::lattice::{LatticeSize, Region};
use crate::particle_store::ParticleStore;
use crate::render_mesh::ParticleMesh;
use crate::resize_controller::ResizeController;
use crate::update_pass::{FieldInputs, UpdatePass};

// Spacing between the seeds of regions initialized by one resize.
const REGION_SEED_STRIDE: f32 = 123.45;

fn fresh_seed() -> f32 {
    rand::thread_rng().gen_range(10000.0..99999.0)
}

pub struct ParticleField {
    params: FieldParams,
    overrides: ParamOverrides,
    store: ParticleStore,
    mesh: ParticleMesh,
    init_pass: InitPass,
    update_pass: UpdatePass,
    draw_pass: DrawPass,
    resize: ResizeController,
    // Largest lattice width or height the device can hold.
    max_dimension: u32,
    start_time: Instant,
}

impl ParticleField {
    pub fn new(
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        params: FieldParams,
    ) -> Self {
        ParticleField::with_seed(device, encoder, params, fresh_seed())
    }

    // Allocates the lattice for `params.particle_count` and fills every
    // channel from `seed`. The work is recorded into `encoder`.
    pub fn with_seed(
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        params: FieldParams,
        seed: f32,
    ) -> Self {
        let max_dimension = device.limits().max_texture_dimension_2d;
        let lattice = LatticeSize::from_count_limited(params.particle_count, max_dimension);
        log::info!(
            "Setting up particle field: requested {} particles, realized {}x{} = {}",
            params.particle_count,
            lattice.width,
            lattice.height,
            lattice.count()
        );
        let store = ParticleStore::new(device, lattice, params.channels.channel_count());
        let mesh = ParticleMesh::new(device, lattice, params.particle_color);
        let field = ParticleField {
            overrides: ParamOverrides::default(),
            store,
            mesh,
            init_pass: InitPass::new(device),
            update_pass: UpdatePass::new(device),
            draw_pass: DrawPass::new(device),
            resize: ResizeController::new(params.resize_debounce(), params.particle_count),
            max_dimension,
            start_time: Instant::now(),
            params,
        };
        field.initialize(device, encoder, &field.store, lattice.full_region(), seed);
        field
    }

    fn initialize(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        store: &ParticleStore,
        region: Region,
        seed: f32,
    ) {
        let effective = self.effective_params();
        let weights = WeightRange {
            min: effective.min_weight,
            max: effective.max_weight,
        };
        for channel in 0..store.channels() {
            self.init_pass
                .initialize_region(device, encoder, store, channel, region, seed, weights);
        }
    }

    pub fn particle_count(&self) -> usize {
        self.store.lattice().count()
    }

    pub fn lattice(&self) -> LatticeSize {
        self.store.lattice()
    }

    pub fn params(&self) -> &FieldParams {
        &self.params
    }

    // Changes to `particle_count` are picked up, debounced, by `update`.
    pub fn params_mut(&mut self) -> &mut FieldParams {
        &mut self.params
    }

    pub fn overrides(&self) -> &ParamOverrides {
        &self.overrides
    }

    pub fn set_overrides(&mut self, overrides: ParamOverrides) {
        if self.overrides == overrides {
            return;
        }
        log::debug!("Parameter overrides now {:?}", overrides);
        self.overrides = overrides;
    }

    pub fn clear_overrides(&mut self) {
        self.set_overrides(ParamOverrides::default());
    }

    // Configured parameters with the current overrides applied.
    pub fn effective_params(&self) -> FieldParams {
        self.params.with_overrides(&self.overrides)
    }

    // Debounced: the lattice changes on a later `update` once no other
    // request has arrived for the configured quiet period.
    pub fn resize_particles(&mut self, count: usize) {
        self.params.particle_count = count;
        self.sync_requested_count(Instant::now());
    }

    fn sync_requested_count(&mut self, now: Instant) {
        self.resize.set_quiet_period(self.params.resize_debounce());
        let current_count = self.particle_count();
        self.resize.sync(self.params.particle_count, current_count, now);
    }

    // Resizes right away, keeping the state of every cell the old and new
    // lattices share, and makes `count` the configured particle count.
    // Returns false when the dimensions would not change.
    pub fn apply_resize(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        count: usize,
    ) -> bool {
        self.params.particle_count = count;
        self.resize.applied(count);
        let old_lattice = self.store.lattice();
        let new_lattice = LatticeSize::from_count_limited(count, self.max_dimension);
        if new_lattice == old_lattice {
            log::debug!(
                "Resize to {} particles keeps the {}x{} lattice",
                count,
                old_lattice.width,
                old_lattice.height
            );
            return false;
        }
        log::info!(
            "Resizing particle lattice {}x{} -> {}x{} ({} particles)",
            old_lattice.width,
            old_lattice.height,
            new_lattice.width,
            new_lattice.height,
            new_lattice.count()
        );
        let store = ParticleStore::new(device, new_lattice, self.store.channels());
        store.copy_region_from(&self.store, old_lattice.overlap(&new_lattice), encoder);
        let base_seed = fresh_seed();
        for (i, region) in old_lattice.added_regions(&new_lattice).into_iter().enumerate() {
            let seed = base_seed + i as f32 * REGION_SEED_STRIDE;
            self.initialize(device, encoder, &store, region, seed);
        }
        self.store = store;
        self.mesh = ParticleMesh::new(device, new_lattice, self.params.particle_color);
        true
    }

    // Applies a due resize, then advances every particle one step using the
    // elapsed time as the jitter seed. Without any field the particles keep
    // their state.
    pub fn update(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        fields: &FieldInputs<'_>,
    ) {
        let now = Instant::now();
        self.sync_requested_count(now);
        if let Some(count) = self.resize.poll(now) {
            self.apply_resize(device, encoder, count);
        }
        let frame_seed = now.duration_since(self.start_time).as_secs_f32();
        self.update_with_seed(device, encoder, fields, frame_seed);
    }

    pub fn update_with_seed(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        fields: &FieldInputs<'_>,
        frame_seed: f32,
    ) -> bool {
        let effective = self.effective_params();
        self.update_pass
            .run(device, encoder, &mut self.store, fields, &effective, frame_seed)
    }

    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        destination: &Destination<'_>,
        use_small_particles: bool,
    ) {
        let effective = self.effective_params();
        let point_size = if use_small_particles {
            effective.small_particle_size()
        } else {
            effective.particle_size
        };
        self.draw_pass.render(
            device,
            encoder,
            &self.store,
            &self.mesh,
            destination,
            point_size,
            effective.speed_threshold,
        );
    }

    // Re-tints random contiguous runs of particles until the next resize.
    pub fn update_random_color_blocks<F: FnMut() -> [f32; 4]>(
        &mut self,
        queue: &wgpu::Queue,
        num_blocks: usize,
        block_size: usize,
        color_fn: F,
    ) {
        self.mesh
            .update_random_color_blocks(queue, num_blocks, block_size, color_fn);
    }

    // One value pair per particle, row-major.
    pub fn load_channel(&self, queue: &wgpu::Queue, channel: usize, data: &[[f32; 2]]) {
        self.store.load_channel(queue, channel, data);
    }
}
