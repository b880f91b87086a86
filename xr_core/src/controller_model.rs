use std::sync::Arc;
use std::thread::{self, JoinHandle};

use glam::{Mat4, Quat, Vec3};
use log::{debug, warn};
use openxr::sys as xr;

use crate::error::{ResultExt, XrError, XrResult};
use crate::gltf::{self, GltfLoader, Model};
use crate::runtime::{NodeProperty, Runtime};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// One rigid part of the controller, drawn with `transform` applied.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerModelComponent {
    /// Column major model transform.
    pub transform: [f32; 16],
    pub vertex_offset: u32,
    pub vertex_count: u32,
    pub index_offset: u32,
    pub index_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ModelNode {
    parent: Option<usize>,
    component: Option<usize>,
    local: Mat4,
    world: Mat4,
}

pub struct ControllerModelData<'a> {
    pub vertices: &'a [ControllerModelVertex],
    pub indices: &'a [u32],
    pub components: &'a [ControllerModelComponent],
}

/// Geometry and node hierarchy flattened out of a controller glTF.
///
/// Nodes are stored parent before child, so a single forward pass re-accumulates world
/// transforms.
#[derive(Debug, Clone, Default)]
pub struct LoadedModel {
    vertices: Vec<ControllerModelVertex>,
    indices: Vec<u32>,
    components: Vec<ControllerModelComponent>,
    nodes: Vec<ModelNode>,
    /// Runtime node state index to flattened node index.
    node_state_indices: Vec<Option<usize>>,
}

impl LoadedModel {
    pub fn from_gltf(model: &Model, node_properties: &[NodeProperty]) -> XrResult<Self> {
        let scene_index = model.default_scene.unwrap_or(0);
        let scene = model.scenes.get(scene_index).ok_or_else(|| {
            XrError::InvalidModel(format!("scene {} does not exist", scene_index))
        })?;

        let mut loaded = LoadedModel {
            node_state_indices: vec![None; node_properties.len()],
            ..Default::default()
        };
        let mut visited = vec![false; model.nodes.len()];

        for &root in &scene.nodes {
            loaded.add_node(model, node_properties, &mut visited, root)?;
        }

        let unmatched = loaded
            .node_state_indices
            .iter()
            .filter(|index| index.is_none())
            .count();
        if unmatched > 0 {
            debug!("{} controller model nodes have no match in the glTF", unmatched);
        }

        Ok(loaded)
    }

    /// Walks the subtree under `root` depth first, parents before children.
    fn add_node(
        &mut self,
        model: &Model,
        node_properties: &[NodeProperty],
        visited: &mut [bool],
        root: usize,
    ) -> XrResult<()> {
        let mut pending: Vec<(usize, Option<usize>, Mat4, &str)> =
            vec![(root, None, Mat4::IDENTITY, "")];

        while let Some((node_index, parent, parent_world, parent_name)) = pending.pop() {
            let node = model.nodes.get(node_index).ok_or_else(|| {
                XrError::InvalidModel(format!("node {} does not exist", node_index))
            })?;
            if std::mem::replace(&mut visited[node_index], true) {
                return Err(XrError::InvalidModel(format!(
                    "node {} is referenced more than once",
                    node_index
                )));
            }

            let local = node_local_transform(node);
            let world = parent_world * local;
            let flat_index = self.nodes.len();
            self.nodes.push(ModelNode {
                parent,
                component: None,
                local,
                world,
            });

            let name = node.name.as_deref().unwrap_or("");
            for (state_index, property) in node_properties.iter().enumerate() {
                if property.node_name == name
                    && (property.parent_node_name.is_empty()
                        || property.parent_node_name == parent_name)
                {
                    self.node_state_indices[state_index] = Some(flat_index);
                }
            }

            if let Some(mesh) = node.mesh {
                let component = self.load_mesh(model, mesh, world)?;
                self.nodes[flat_index].component = Some(component);
            }

            for &child in node.children.iter().rev() {
                pending.push((child, Some(flat_index), world, name));
            }
        }
        Ok(())
    }

    fn load_mesh(&mut self, model: &Model, mesh_index: usize, world: Mat4) -> XrResult<usize> {
        let mesh = model
            .meshes
            .get(mesh_index)
            .ok_or_else(|| XrError::InvalidModel(format!("mesh {} does not exist", mesh_index)))?;

        let vertex_offset = self.vertices.len();
        let index_offset = self.indices.len();

        for primitive in &mesh.primitives {
            if primitive.mode != gltf::MODE_TRIANGLES {
                return Err(XrError::InvalidModel(format!(
                    "primitive mode {} is not supported, only triangles are",
                    primitive.mode
                )));
            }

            let position_accessor = *primitive.attributes.get("POSITION").ok_or_else(|| {
                XrError::InvalidModel("primitive has no POSITION attribute".to_owned())
            })?;
            let positions = read_vec3(model, position_accessor)?;
            let normals = match primitive.attributes.get("NORMAL") {
                Some(&accessor) => {
                    let normals = read_vec3(model, accessor)?;
                    if normals.len() != positions.len() {
                        return Err(XrError::InvalidModel(format!(
                            "{} normals for {} positions",
                            normals.len(),
                            positions.len()
                        )));
                    }
                    normals
                }
                None => vec![[0.0; 3]; positions.len()],
            };

            let primitive_indices = match primitive.indices {
                Some(accessor) => read_indices(model, accessor)?,
                None => (0..positions.len() as u32).collect(),
            };
            if primitive_indices.len() % 3 != 0 {
                return Err(XrError::InvalidModel(format!(
                    "index count {} is not a multiple of 3",
                    primitive_indices.len()
                )));
            }
            if let Some(index) = primitive_indices
                .iter()
                .find(|&&index| index as usize >= positions.len())
            {
                return Err(XrError::InvalidModel(format!(
                    "index {} is out of range for {} vertices",
                    index,
                    positions.len()
                )));
            }

            let base = (self.vertices.len() - vertex_offset) as u32;
            self.vertices.extend(
                positions
                    .into_iter()
                    .zip(normals)
                    .map(|(position, normal)| ControllerModelVertex { position, normal }),
            );
            for triangle in primitive_indices.chunks_exact(3) {
                self.indices.extend_from_slice(&[
                    base + triangle[0],
                    base + triangle[2],
                    base + triangle[1],
                ]);
            }
        }

        self.components.push(ControllerModelComponent {
            transform: world.to_cols_array(),
            vertex_offset: vertex_offset as u32,
            vertex_count: (self.vertices.len() - vertex_offset) as u32,
            index_offset: index_offset as u32,
            index_count: (self.indices.len() - index_offset) as u32,
        });
        Ok(self.components.len() - 1)
    }

    /// Replaces the local transform of every matched node with its runtime pose.
    pub fn apply_node_states(&mut self, states: &[xr::Posef]) {
        for (state, node_index) in states.iter().zip(&self.node_state_indices) {
            if let Some(node) = node_index.and_then(|index| self.nodes.get_mut(index)) {
                let rotation = Quat::from_xyzw(
                    state.orientation.x,
                    state.orientation.y,
                    state.orientation.z,
                    state.orientation.w,
                );
                let translation = Vec3::new(state.position.x, state.position.y, state.position.z);
                node.local = Mat4::from_rotation_translation(rotation, translation);
            }
        }
        self.accumulate_transforms();
    }

    fn accumulate_transforms(&mut self) {
        for i in 0..self.nodes.len() {
            let parent_world = self.nodes[i].parent.map(|parent| self.nodes[parent].world);
            let node = &mut self.nodes[i];
            node.world = match parent_world {
                Some(parent_world) => parent_world * node.local,
                None => node.local,
            };
            if let Some(component) = node.component {
                self.components[component].transform = node.world.to_cols_array();
            }
        }
    }

    pub fn data(&self) -> ControllerModelData<'_> {
        ControllerModelData {
            vertices: &self.vertices,
            indices: &self.indices,
            components: &self.components,
        }
    }

    /// Column major world transform of the flattened node `index`.
    pub fn node_transform(&self, index: usize) -> Option<[f32; 16]> {
        self.nodes.get(index).map(|node| node.world.to_cols_array())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

fn node_local_transform(node: &gltf::Node) -> Mat4 {
    if let Some(matrix) = &node.matrix {
        return Mat4::from_cols_array(matrix);
    }
    let translation = node.translation.map_or(Vec3::ZERO, Vec3::from);
    let rotation = node
        .rotation
        .map_or(Quat::IDENTITY, |[x, y, z, w]| Quat::from_xyzw(x, y, z, w));
    let scale = node.scale.map_or(Vec3::ONE, Vec3::from);
    Mat4::from_scale_rotation_translation(scale, rotation, translation)
}

/// Bytes of every element of `accessor`, validated against its view and buffer.
fn accessor_elements<'a>(
    model: &'a Model,
    accessor_index: usize,
) -> XrResult<(&'a gltf::Accessor, Vec<&'a [u8]>)> {
    let accessor = model.accessors.get(accessor_index).ok_or_else(|| {
        XrError::InvalidModel(format!("accessor {} does not exist", accessor_index))
    })?;
    let view_index = accessor.buffer_view.ok_or_else(|| {
        XrError::InvalidModel(format!("accessor {} has no buffer view", accessor_index))
    })?;
    let view = model.buffer_views.get(view_index).ok_or_else(|| {
        XrError::InvalidModel(format!("buffer view {} does not exist", view_index))
    })?;
    let buffer = model.buffers.get(view.buffer).ok_or_else(|| {
        XrError::InvalidModel(format!("buffer {} does not exist", view.buffer))
    })?;

    let view_bytes = view
        .byte_offset
        .checked_add(view.byte_length)
        .and_then(|end| buffer.data.get(view.byte_offset..end))
        .ok_or_else(|| {
            XrError::InvalidModel(format!("buffer view {} exceeds its buffer", view_index))
        })?;

    let component_size = gltf::component_size(accessor.component_type).ok_or_else(|| {
        XrError::InvalidModel(format!(
            "accessor {} has unknown component type {}",
            accessor_index, accessor.component_type
        ))
    })?;
    let element_size = component_size * accessor.accessor_type.components();
    let stride = view.byte_stride.unwrap_or(element_size);
    if stride < element_size {
        return Err(XrError::InvalidModel(format!(
            "buffer view {} stride {} is smaller than its elements",
            view_index, stride
        )));
    }

    (0..accessor.count)
        .map(|i| {
            i.checked_mul(stride)
                .and_then(|offset| offset.checked_add(accessor.byte_offset))
                .and_then(|start| Some(start..start.checked_add(element_size)?))
                .and_then(|range| view_bytes.get(range))
                .ok_or_else(|| {
                    XrError::InvalidModel(format!(
                        "accessor {} exceeds buffer view {}",
                        accessor_index, view_index
                    ))
                })
        })
        .collect::<XrResult<Vec<_>>>()
        .map(|elements| (accessor, elements))
}

fn read_vec3(model: &Model, accessor_index: usize) -> XrResult<Vec<[f32; 3]>> {
    let (accessor, elements) = accessor_elements(model, accessor_index)?;
    if accessor.accessor_type != gltf::AccessorType::Vec3
        || accessor.component_type != gltf::COMPONENT_FLOAT
    {
        return Err(XrError::InvalidModel(format!(
            "accessor {} must hold float VEC3 elements",
            accessor_index
        )));
    }

    Ok(elements
        .into_iter()
        .map(|bytes| {
            let mut value = [0.0; 3];
            for (out, chunk) in value.iter_mut().zip(bytes.chunks_exact(4)) {
                *out = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            }
            value
        })
        .collect())
}

fn read_indices(model: &Model, accessor_index: usize) -> XrResult<Vec<u32>> {
    let (accessor, elements) = accessor_elements(model, accessor_index)?;
    if accessor.accessor_type != gltf::AccessorType::Scalar {
        return Err(XrError::InvalidModel(format!(
            "index accessor {} must be SCALAR",
            accessor_index
        )));
    }

    match accessor.component_type {
        gltf::COMPONENT_UNSIGNED_BYTE => Ok(elements.into_iter().map(|b| u32::from(b[0])).collect()),
        gltf::COMPONENT_UNSIGNED_SHORT => Ok(elements
            .into_iter()
            .map(|b| u32::from(u16::from_le_bytes([b[0], b[1]])))
            .collect()),
        gltf::COMPONENT_UNSIGNED_INT => Ok(elements
            .into_iter()
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()),
        other => Err(XrError::InvalidModel(format!(
            "index accessor {} has component type {}",
            accessor_index, other
        ))),
    }
}

/// A controller mesh supplied by the runtime for one subaction path.
///
/// Loading runs on a background thread. Its failure is reported by the next
/// [`update_components`](Self::update_components) or [`data`](Self::data) call.
pub struct ControllerModel {
    runtime: Arc<dyn Runtime>,
    subaction_path: String,
    model_key: u64,
    load_thread: Option<JoinHandle<XrResult<LoadedModel>>>,
    model: Option<LoadedModel>,
}

impl ControllerModel {
    pub fn new(runtime: Arc<dyn Runtime>, subaction_path: &str) -> Self {
        Self {
            runtime,
            subaction_path: subaction_path.to_owned(),
            model_key: 0,
            load_thread: None,
            model: None,
        }
    }

    pub fn subaction_path(&self) -> &str {
        &self.subaction_path
    }

    pub fn is_loading(&self) -> bool {
        self.load_thread.is_some()
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Starts loading unless a load is running or done. Without a runtime model for the
    /// subaction path the controller model stays unloaded.
    pub fn load(&mut self, session: xr::Session) -> XrResult<()> {
        if self.is_loading() || self.is_loaded() {
            return Ok(());
        }

        let user_path = self
            .runtime
            .string_to_path(&self.subaction_path)
            .or_fail(&format!("Failed to get user path \"{}\".", self.subaction_path))?;
        let model_key = self
            .runtime
            .get_controller_model_key(session, user_path)
            .or_fail("Failed to get controller model key.")?;
        if model_key == 0 {
            debug!("No controller model for {}", self.subaction_path);
            return Ok(());
        }
        self.model_key = model_key;

        let runtime = self.runtime.clone();
        let thread = thread::Builder::new()
            .name("controller-model-load".to_owned())
            .spawn(move || load_model(runtime.as_ref(), session, model_key))?;
        self.load_thread = Some(thread);
        Ok(())
    }

    /// Picks up a finished load. `Ok(true)` once the model is available.
    fn poll(&mut self) -> XrResult<bool> {
        if self.model.is_some() {
            return Ok(true);
        }
        if !self
            .load_thread
            .as_ref()
            .map_or(false, |thread| thread.is_finished())
        {
            return Ok(false);
        }

        match self.join() {
            Some(loaded) => {
                self.model = Some(loaded?);
                Ok(true)
            }
            None => Err(XrError::InvalidModel(
                "controller model load thread panicked".to_owned(),
            )),
        }
    }

    /// Waits for the load thread. `None` when there was none or it panicked.
    fn join(&mut self) -> Option<XrResult<LoadedModel>> {
        let thread = self.load_thread.take()?;
        match thread.join() {
            Ok(loaded) => Some(loaded),
            Err(_) => {
                warn!("Controller model load thread for {} panicked", self.subaction_path);
                None
            }
        }
    }

    /// Moves every matched node to its current runtime pose.
    pub fn update_components(&mut self, session: xr::Session) -> XrResult<()> {
        if !self.poll()? {
            return Ok(());
        }
        let states = self
            .runtime
            .get_controller_model_state(session, self.model_key)
            .or_fail("Failed to get controller model state.")?;
        if let Some(model) = self.model.as_mut() {
            model.apply_node_states(&states);
        }
        Ok(())
    }

    /// `None` while the model is not loaded.
    pub fn data(&mut self) -> XrResult<Option<ControllerModelData<'_>>> {
        self.poll()?;
        Ok(self.model.as_ref().map(LoadedModel::data))
    }
}

impl Drop for ControllerModel {
    fn drop(&mut self) {
        if let Some(Err(err)) = self.join() {
            debug!("Dropped a failed controller model load for {}: {}", self.subaction_path, err);
        }
    }
}

fn load_model(runtime: &dyn Runtime, session: xr::Session, model_key: u64) -> XrResult<LoadedModel> {
    let size = runtime
        .load_controller_model(session, model_key, &mut [])
        .or_fail("Failed to get controller model buffer size.")?;
    let mut buffer = vec![0u8; size];
    let written = runtime
        .load_controller_model(session, model_key, &mut buffer)
        .or_fail("Failed to load controller model binary.")?;
    buffer.truncate(written);

    let gltf = GltfLoader::new()
        .with_image_loader(|_, _, _| Ok(()))
        .load_binary_from_memory(&buffer)
        .map_err(XrError::Gltf)?;
    for warning in &gltf.warnings {
        warn!("Controller model: {}", warning);
    }

    let properties = runtime
        .get_controller_model_properties(session, model_key)
        .or_fail("Failed to get controller model node properties.")?;

    LoadedModel::from_gltf(&gltf.model, &properties)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gltf::{Accessor, AccessorType, Buffer, BufferView, Mesh, Node, Primitive, Scene};

    fn translated(name: &str, translation: [f32; 3], children: Vec<usize>) -> Node {
        Node {
            name: Some(name.to_owned()),
            children,
            translation: Some(translation),
            ..Default::default()
        }
    }

    fn chain() -> Model {
        Model {
            scenes: vec![Scene {
                name: None,
                nodes: vec![0],
            }],
            default_scene: Some(0),
            nodes: vec![
                Node {
                    name: Some("root".to_owned()),
                    children: vec![1],
                    ..Default::default()
                },
                translated("a", [1.0, 0.0, 0.0], vec![2]),
                translated("b", [0.0, 1.0, 0.0], vec![]),
            ],
            ..Default::default()
        }
    }

    fn translation(transform: [f32; 16]) -> [f32; 3] {
        [transform[12], transform[13], transform[14]]
    }

    fn triangle_mesh(indices: &[u16]) -> Model {
        let mut data = Vec::new();
        for position in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for value in position {
                data.extend_from_slice(&value.to_le_bytes());
            }
        }
        for index in indices {
            data.extend_from_slice(&index.to_le_bytes());
        }

        Model {
            scenes: vec![Scene {
                name: None,
                nodes: vec![0],
            }],
            nodes: vec![Node {
                mesh: Some(0),
                ..Default::default()
            }],
            meshes: vec![Mesh {
                name: None,
                primitives: vec![Primitive {
                    attributes: [("POSITION".to_owned(), 0)].into_iter().collect(),
                    indices: Some(1),
                    mode: gltf::MODE_TRIANGLES,
                }],
            }],
            accessors: vec![
                Accessor {
                    buffer_view: Some(0),
                    byte_offset: 0,
                    component_type: gltf::COMPONENT_FLOAT,
                    normalized: false,
                    count: 3,
                    accessor_type: AccessorType::Vec3,
                },
                Accessor {
                    buffer_view: Some(1),
                    byte_offset: 0,
                    component_type: gltf::COMPONENT_UNSIGNED_SHORT,
                    normalized: false,
                    count: indices.len(),
                    accessor_type: AccessorType::Scalar,
                },
            ],
            buffer_views: vec![
                BufferView {
                    buffer: 0,
                    byte_offset: 0,
                    byte_length: 36,
                    byte_stride: None,
                    target: None,
                },
                BufferView {
                    buffer: 0,
                    byte_offset: 36,
                    byte_length: indices.len() * 2,
                    byte_stride: None,
                    target: None,
                },
            ],
            buffers: vec![Buffer {
                uri: None,
                byte_length: data.len(),
                data,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn chain_accumulates_parent_first() {
        let loaded = LoadedModel::from_gltf(&chain(), &[]).unwrap();
        assert_eq!(loaded.node_count(), 3);
        assert_eq!(translation(loaded.node_transform(2).unwrap()), [1.0, 1.0, 0.0]);
    }

    #[test]
    fn node_states_move_matched_nodes_and_children() {
        let properties = [NodeProperty {
            parent_node_name: "root".to_owned(),
            node_name: "a".to_owned(),
        }];
        let mut loaded = LoadedModel::from_gltf(&chain(), &properties).unwrap();

        let mut pose = xr::Posef {
            orientation: xr::Quaternionf {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                w: 1.0,
            },
            position: xr::Vector3f {
                x: 2.0,
                y: 0.0,
                z: 0.0,
            },
        };
        loaded.apply_node_states(std::slice::from_ref(&pose));
        assert_eq!(translation(loaded.node_transform(2).unwrap()), [2.0, 1.0, 0.0]);

        pose.position.z = 3.0;
        loaded.apply_node_states(&[pose]);
        assert_eq!(translation(loaded.node_transform(2).unwrap()), [2.0, 1.0, 3.0]);
    }

    #[test]
    fn parent_name_must_match_when_given() {
        let properties = [NodeProperty {
            parent_node_name: "elsewhere".to_owned(),
            node_name: "b".to_owned(),
        }];
        let loaded = LoadedModel::from_gltf(&chain(), &properties).unwrap();
        assert_eq!(loaded.node_state_indices, vec![None]);
    }

    #[test]
    fn triangles_are_rewound() {
        let loaded = LoadedModel::from_gltf(&triangle_mesh(&[0, 1, 2]), &[]).unwrap();
        let data = loaded.data();
        assert_eq!(data.indices, &[0, 2, 1]);
        assert_eq!(data.vertices.len(), 3);
        assert_eq!(data.components.len(), 1);
        assert_eq!(data.components[0].index_count, 3);
    }

    #[test]
    fn partial_triangles_are_rejected() {
        assert!(matches!(
            LoadedModel::from_gltf(&triangle_mesh(&[0, 1]), &[]),
            Err(XrError::InvalidModel(_))
        ));
    }

    #[test]
    fn overrunning_accessor_is_rejected() {
        let mut model = triangle_mesh(&[0, 1, 2]);
        model.accessors[0].count = 4;
        assert!(matches!(
            LoadedModel::from_gltf(&model, &[]),
            Err(XrError::InvalidModel(_))
        ));
    }

    #[test]
    fn accessor_offset_past_the_address_space_is_rejected() {
        let mut model = triangle_mesh(&[0, 1, 2]);
        model.accessors[0].byte_offset = usize::MAX - 4;
        assert!(matches!(
            LoadedModel::from_gltf(&model, &[]),
            Err(XrError::InvalidModel(_))
        ));
    }

    #[test]
    fn huge_stride_is_rejected() {
        let mut model = triangle_mesh(&[0, 1, 2]);
        model.buffer_views[0].byte_stride = Some(usize::MAX / 2 + 1);
        assert!(matches!(
            LoadedModel::from_gltf(&model, &[]),
            Err(XrError::InvalidModel(_))
        ));
    }

    #[test]
    fn deep_node_chains_do_not_recurse() {
        let depth = 200_000;
        let nodes = (0..depth)
            .map(|i| Node {
                name: Some(format!("n{}", i)),
                children: if i + 1 < depth { vec![i + 1] } else { vec![] },
                translation: Some([0.0, 0.0, 1.0]),
                ..Default::default()
            })
            .collect();
        let model = Model {
            scenes: vec![Scene {
                name: None,
                nodes: vec![0],
            }],
            nodes,
            ..Default::default()
        };

        let loaded = LoadedModel::from_gltf(&model, &[]).unwrap();
        assert_eq!(loaded.node_count(), depth);
        assert_eq!(
            translation(loaded.node_transform(depth - 1).unwrap()),
            [0.0, 0.0, depth as f32]
        );
    }

    #[test]
    fn node_reachable_twice_is_rejected() {
        let mut model = chain();
        model.nodes[2].children = vec![1];
        assert!(matches!(
            LoadedModel::from_gltf(&model, &[]),
            Err(XrError::InvalidModel(_))
        ));
    }

    #[test]
    fn non_triangle_primitives_are_rejected() {
        let mut model = triangle_mesh(&[0, 1, 2]);
        model.meshes[0].primitives[0].mode = 1;
        assert!(matches!(
            LoadedModel::from_gltf(&model, &[]),
            Err(XrError::InvalidModel(_))
        ));
    }
}
