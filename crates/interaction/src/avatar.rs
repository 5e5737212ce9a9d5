use tracing::debug;

use crate::math::{Pose, Vec3};
use crate::scene::NodeId;

const EXCLUDED_BONE_MARKERS: [&str; 2] = ["camera", "pivot"];

#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub node: NodeId,
    pub pose: Pose,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub forward: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandAnchor {
    pub node: NodeId,
    pub pose: Pose,
    pub synthesized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SynthesizedAnchor {
    node: NodeId,
    local_offset: Vec3,
}

/// The registered player avatar. The scene adapter refreshes poses each frame;
/// interactables only ever borrow it.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarRig {
    pub root: Pose,
    pub camera: CameraPose,
    bones: Vec<Bone>,
    synthesized_anchor_node: NodeId,
    synthesized_anchor: Option<SynthesizedAnchor>,
}

impl AvatarRig {
    /// `synthesized_anchor_node` is the node id handed out if no bone matches.
    pub fn new(root: Pose, camera: CameraPose, synthesized_anchor_node: NodeId) -> Self {
        Self {
            root,
            camera,
            bones: Vec::new(),
            synthesized_anchor_node,
            synthesized_anchor: None,
        }
    }

    pub fn with_bone(mut self, name: impl Into<String>, node: NodeId, pose: Pose) -> Self {
        self.bones.push(Bone {
            name: name.into(),
            node,
            pose,
        });
        self
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone_mut(&mut self, node: NodeId) -> Option<&mut Bone> {
        self.bones.iter_mut().find(|bone| bone.node == node)
    }

    pub fn position(&self) -> Vec3 {
        self.root.position
    }

    /// Moves the root, carrying bones and camera along so their offsets in
    /// the root frame are preserved through both translation and turning.
    pub fn move_root_to(&mut self, root: Pose) {
        let turn = root.rotation * self.root.rotation.conjugate();
        let old_origin = self.root.position;
        let carry = |position: Vec3| root.position + turn.rotate(position - old_origin);
        for bone in &mut self.bones {
            bone.pose.position = carry(bone.pose.position);
            bone.pose.rotation = turn * bone.pose.rotation;
        }
        self.camera.position = carry(self.camera.position);
        self.camera.forward = turn.rotate(self.camera.forward);
        self.root = root;
    }

    fn find_bone(&self, name: &str) -> Option<&Bone> {
        let wanted = name.to_ascii_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.bones.iter().find(|bone| {
            let bone_name = bone.name.to_ascii_lowercase();
            bone_name.contains(&wanted)
                && !EXCLUDED_BONE_MARKERS
                    .iter()
                    .any(|marker| bone_name.contains(marker))
        })
    }

    /// Named bone if present, otherwise a cached anchor parented to the root.
    pub fn resolve_hand_anchor(&mut self, name: &str, fallback_offset: Vec3) -> HandAnchor {
        if let Some(bone) = self.find_bone(name) {
            return HandAnchor {
                node: bone.node,
                pose: bone.pose,
                synthesized: false,
            };
        }

        let anchor = match self.synthesized_anchor {
            Some(anchor) => anchor,
            None => {
                let anchor = SynthesizedAnchor {
                    node: self.synthesized_anchor_node,
                    local_offset: fallback_offset,
                };
                debug!(
                    bone = name,
                    node = anchor.node.0,
                    "hand_anchor_synthesized"
                );
                self.synthesized_anchor = Some(anchor);
                anchor
            }
        };
        HandAnchor {
            node: anchor.node,
            pose: self.root.child(anchor.local_offset),
            synthesized: true,
        }
    }

    /// Current pose of a previously resolved anchor node.
    pub fn anchor_pose(&self, node: NodeId) -> Option<Pose> {
        if let Some(bone) = self.bones.iter().find(|bone| bone.node == node) {
            return Some(bone.pose);
        }
        self.synthesized_anchor
            .filter(|anchor| anchor.node == node)
            .map(|anchor| self.root.child(anchor.local_offset))
    }
}
