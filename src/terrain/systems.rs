use crate::helpers::mesh::{skirt_mesh, terrain_mesh};
use crate::terrain::components::{TerrainEntity, TerrainLod};
use crate::terrain::events::*;
use crate::terrain::logic::{
    GeneratedTerrain, accepts_rescale, framing_distance, image_from_raster, run_generation, step_lod,
    surface_transform,
};
use crate::terrain::resources::*;
use bevy::input::ButtonInput;
use bevy::prelude::*;
use std::sync::Arc;
use terrainmesh::jobs::spawn_job;
use terrainmesh::mesh_data::TerrainMeshSet;
use terrainmesh::rescale::HeightRescaler;

pub fn request_initial_generation(mut events: MessageWriter<GenerateTerrainEvent>) {
    events.write(GenerateTerrainEvent);
}

pub fn start_generation(
    mut events: MessageReader<GenerateTerrainEvent>,
    settings: Res<TerrainSettings>,
    queue: Res<CompletionQueue>,
    mut state: ResMut<TerrainState>,
) {
    for _ in events.read() {
        if let Err(err) = state.jobs.begin_generation() {
            warn!("Ignoring generation request: {err}");
            continue;
        }

        let config = settings.0.clone();
        spawn_job(
            &queue.0.handle(),
            move || run_generation(&config),
            |world: &mut World, result: terrainmesh::Result<GeneratedTerrain>| {
                let mut state = world.resource_mut::<TerrainState>();
                state.jobs.finish_generation(&result);
                let ready = match result {
                    Ok(generated) => {
                        let set = Arc::new(generated.set);
                        state.reference = Some(set.clone());
                        state.current = Some(set);
                        state.pending_texture = generated.texture;
                        true
                    }
                    Err(err) => {
                        error!("Terrain generation failed: {err}");
                        false
                    }
                };
                if ready {
                    world.write_message(TerrainReadyEvent);
                }
            },
        );
    }
}

pub fn start_rescale(
    mut events: MessageReader<RescaleTerrainEvent>,
    mut state: ResMut<TerrainState>,
    queue: Res<CompletionQueue>,
) {
    for event in events.read() {
        let Some(reference) = state.reference.clone() else {
            warn!("No terrain to rescale yet");
            continue;
        };
        if let Err(err) = state.jobs.begin_rescale() {
            warn!("Ignoring rescale request: {err}");
            continue;
        }

        let metadata = reference.metadata.with_height_scale(event.height_scale);
        let source = reference.clone();
        spawn_job(
            &queue.0.handle(),
            move || HeightRescaler::new().rescale(&reference, &metadata),
            move |world: &mut World, result: terrainmesh::Result<TerrainMeshSet>| {
                let mut state = world.resource_mut::<TerrainState>();
                state.jobs.finish_rescale(&result);
                let ready = match result {
                    Ok(set) if accepts_rescale(state.reference.as_ref(), &source) => {
                        state.current = Some(Arc::new(set));
                        true
                    }
                    Ok(_) => {
                        warn!("Dropping rescale of a terrain that has since been regenerated");
                        false
                    }
                    Err(err) => {
                        error!("Height rescale failed: {err}");
                        false
                    }
                };
                if ready {
                    world.write_message(TerrainReadyEvent);
                }
            },
        );
    }
}

/// Runs job completions on the main schedule, where they may touch the `World`.
pub fn apply_completed_jobs(world: &mut World) {
    world.resource_scope(|world, queue: Mut<CompletionQueue>| {
        let applied = queue.0.drain(world);
        if applied > 0 {
            debug!("Applied {applied} terrain job completion(s)");
        }
    });
}

pub fn spawn_terrain_on_ready(
    mut commands: Commands,
    mut ready: MessageReader<TerrainReadyEvent>,
    mut frame_events: MessageWriter<FrameTerrainEvent>,
    mut state: ResMut<TerrainState>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut images: ResMut<Assets<Image>>,
    terrain_entities: Query<Entity, With<TerrainEntity>>,
) {
    if ready.read().count() == 0 {
        return;
    }
    let Some(set) = state.current.clone() else {
        return;
    };
    let Some(lod0) = set.lods.first() else {
        return;
    };

    if let Some(raster) = state.pending_texture.take() {
        state.texture = Some(images.add(image_from_raster(&raster)));
    }

    for entity in terrain_entities.iter() {
        commands.entity(entity).despawn();
    }

    let material = materials.add(StandardMaterial {
        base_color: if state.texture.is_some() {
            Color::WHITE
        } else {
            Color::srgb(0.55, 0.6, 0.45)
        },
        base_color_texture: state.texture.clone(),
        perceptual_roughness: 0.95,
        ..default()
    });

    state.visible_lod = state.visible_lod.min(set.lod_count() - 1);
    let visible_lod = state.visible_lod;
    let lod0 = lod0.to_right_handed();

    commands
        .spawn((
            surface_transform(set.kind, &lod0),
            Visibility::Visible,
            TerrainEntity,
        ))
        .with_children(|parent| {
            for (index, lod) in set.lods.iter().enumerate() {
                let lod = lod.to_right_handed();
                let visibility = if index == visible_lod {
                    Visibility::Visible
                } else {
                    Visibility::Hidden
                };

                parent
                    .spawn((
                        Mesh3d(meshes.add(terrain_mesh(&lod))),
                        MeshMaterial3d(material.clone()),
                        Transform::default(),
                        visibility,
                        TerrainLod { index },
                    ))
                    .with_children(|lod_parent| {
                        if let Some(skirt) = skirt_mesh(&lod) {
                            lod_parent.spawn((
                                Mesh3d(meshes.add(skirt)),
                                MeshMaterial3d(material.clone()),
                                Transform::default(),
                            ));
                        }
                    });
            }
        });

    frame_events.write(FrameTerrainEvent {
        distance: framing_distance(&lod0),
    });

    info!(
        "Spawned {:?} terrain: {} LODs, height scale {}, showing LOD{}",
        set.kind,
        set.lod_count(),
        set.metadata.height_scale,
        visible_lod
    );
    if let Some(physics) = &set.physics {
        debug!("Physics mesh available: {} vertices", physics.vertex_count());
    }
}

pub fn terrain_keyboard_control(
    keyboard_input: Res<ButtonInput<KeyCode>>,
    settings: Res<TerrainSettings>,
    mut state: ResMut<TerrainState>,
    mut lod_events: MessageWriter<ShowLodEvent>,
    mut rescale_events: MessageWriter<RescaleTerrainEvent>,
    mut generate_events: MessageWriter<GenerateTerrainEvent>,
) {
    let Some(lod_count) = state.current.as_ref().map(|set| set.lod_count()) else {
        if keyboard_input.just_pressed(KeyCode::KeyR) {
            generate_events.write(GenerateTerrainEvent);
        }
        return;
    };

    let lod_delta = keyboard_input.just_pressed(KeyCode::BracketRight) as i32
        - keyboard_input.just_pressed(KeyCode::BracketLeft) as i32;
    if lod_delta != 0 {
        let lod = step_lod(state.visible_lod, lod_delta, lod_count);
        if lod != state.visible_lod {
            state.visible_lod = lod;
            lod_events.write(ShowLodEvent { lod });
        }
    }

    let scale_steps = keyboard_input.just_pressed(KeyCode::Equal) as i32
        - keyboard_input.just_pressed(KeyCode::Minus) as i32;
    if scale_steps != 0 {
        if let Some(current) = state.height_scale() {
            let height_scale = settings.0.rescale.stepped(current, scale_steps);
            if height_scale != current {
                rescale_events.write(RescaleTerrainEvent { height_scale });
            }
        }
    }

    if keyboard_input.just_pressed(KeyCode::KeyR) {
        generate_events.write(GenerateTerrainEvent);
    }
}

pub fn update_lod_visibility(
    mut events: MessageReader<ShowLodEvent>,
    mut lods: Query<(&TerrainLod, &mut Visibility)>,
) {
    for event in events.read() {
        for (lod, mut visibility) in lods.iter_mut() {
            *visibility = if lod.index == event.lod {
                Visibility::Visible
            } else {
                Visibility::Hidden
            };
        }
        info!("Showing LOD{}", event.lod);
    }
}
