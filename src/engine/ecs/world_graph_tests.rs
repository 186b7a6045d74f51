use crate::engine::ecs::component::{
    DriftComponent, InstanceComponent, RenderableComponent, TextureComponent, TransformComponent,
};
use crate::engine::ecs::system::SystemWorld;
use crate::engine::ecs::{CommandQueue, Entity, World, WorldError};
use crate::engine::graphics::primitives::{CpuMeshHandle, Material, RenderLayer};
use crate::engine::graphics::VisualWorld;

fn renderable() -> RenderableComponent {
    RenderableComponent::new(CpuMeshHandle(0), Material::unlit(), RenderLayer::Decoration)
}

#[test]
fn add_child_sets_parent_and_child_list() {
    let mut w = World::default();

    let p = w.add_component(InstanceComponent::new());
    let c = w.add_component(TransformComponent::default());

    w.add_child(p, c).unwrap();

    assert_eq!(w.parent_of(c), Some(p));
    assert!(w.children_of(p).contains(&c));
}

#[test]
fn set_parent_none_detaches() {
    let mut w = World::default();

    let p = w.add_component(InstanceComponent::new());
    let c = w.add_component(TransformComponent::default());

    w.add_child(p, c).unwrap();
    w.set_parent(c, None).unwrap();

    assert_eq!(w.parent_of(c), None);
    assert!(!w.children_of(p).contains(&c));
}

#[test]
fn reparenting_moves_the_child() {
    let mut w = World::default();

    let a = w.add_component(InstanceComponent::new());
    let b = w.add_component(InstanceComponent::new());
    let c = w.add_component(TransformComponent::default());

    w.add_child(a, c).unwrap();
    w.add_child(b, c).unwrap();

    assert!(w.children_of(a).is_empty());
    assert_eq!(w.children_of(b), &[c]);
}

#[test]
fn prevent_cycles() {
    let mut w = World::default();

    let a = w.add_component(InstanceComponent::new());
    let b = w.add_component(TransformComponent::default());

    w.add_child(a, b).unwrap();

    assert_eq!(w.add_child(b, a), Err(WorldError::Cycle { parent: b, child: a }));
    assert!(w.add_child(a, a).is_err());
}

#[test]
fn remove_leaf_requires_no_children() {
    let mut w = World::default();

    let p = w.add_component(InstanceComponent::new());
    let c = w.add_component(TransformComponent::default());

    w.add_child(p, c).unwrap();

    assert_eq!(w.remove_component_leaf(p).unwrap_err(), WorldError::HasChildren(p));

    w.remove_component_leaf(c).unwrap();
    assert!(!w.contains(c));
    assert!(w.children_of(p).is_empty());
}

#[test]
fn remove_subtree_deletes_descendants() {
    let mut w = World::default();

    let root = w.add_component(InstanceComponent::new());
    let child = w.add_component(renderable());
    let grandchild = w.add_component(TextureComponent::new("assets/img/cloud.png"));

    w.add_child(root, child).unwrap();
    w.add_child(child, grandchild).unwrap();

    let removed = w.remove_component_subtree(root).unwrap();

    assert_eq!(removed.len(), 3);
    assert_eq!(removed[0].name, "instance");
    assert!(w.get_component_node(root).is_none());
    assert!(w.get_component_node(child).is_none());
    assert!(w.get_component_node(grandchild).is_none());
    assert!(w.is_empty());
}

#[test]
fn spawn_builds_tree_and_queues_init_commands() {
    let mut w = World::default();
    let mut q = CommandQueue::new();

    let root = w.spawn(
        Entity::new()
            .with_component(TransformComponent::default())
            .with_nested(renderable(), TextureComponent::new("assets/img/1.jpg"))
            .with_component(DriftComponent::new([0.01, 0.0, 0.0])),
        &mut q,
    );

    assert_eq!(w.len(), 5);
    assert_eq!(w.children_of(root).len(), 3);

    let r = w.find_child::<RenderableComponent>(root).unwrap();
    let t = w.children_of(r)[0];
    assert_eq!(w.find_ancestor::<InstanceComponent>(t), Some(root));
    assert_eq!(w.find_ancestor::<RenderableComponent>(t), Some(r));

    // transform, renderable, texture, drift
    assert_eq!(q.len(), 4);
}

#[test]
fn cleanup_then_remove_unregisters_everything() {
    let mut w = World::default();
    let mut q = CommandQueue::new();
    let mut systems = SystemWorld::new();
    let mut visuals = VisualWorld::new();

    let root = w.spawn(
        Entity::new()
            .with_component(TransformComponent::default())
            .with_nested(renderable(), TextureComponent::new("assets/img/1.jpg"))
            .with_component(DriftComponent::new([0.01, 0.0, 0.0])),
        &mut q,
    );
    q.flush(&mut w, &mut systems, &mut visuals);
    assert_eq!(systems.renderable.len(), 1);
    assert_eq!(systems.drift.len(), 1);
    assert_eq!(systems.texture.pending_len(), 1);

    w.cleanup_subtree(root, &mut q);
    q.flush(&mut w, &mut systems, &mut visuals);
    w.remove_component_subtree(root).unwrap();

    assert!(systems.renderable.is_empty());
    assert!(systems.drift.is_empty());
    assert_eq!(systems.texture.pending_len(), 0);
    assert!(w.is_empty());
}
