//! Sub-box layouts for custom block shapes, authored on a 16-step voxel grid.

use cubeworld_blocks::CustomShape;

use crate::face::Face;

/// Axis-aligned box in sixteenths of a voxel. Faces in `hidden` are never emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubBox {
    pub min: [u8; 3],
    pub max: [u8; 3],
    pub hidden: FaceMask,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FaceMask(u8);

impl FaceMask {
    pub const NONE: FaceMask = FaceMask(0);

    #[inline]
    pub fn with(self, face: Face) -> FaceMask {
        FaceMask(self.0 | (1 << face.index()))
    }

    #[inline]
    pub fn contains(self, face: Face) -> bool {
        self.0 & (1 << face.index()) != 0
    }
}

const fn sub(min: [u8; 3], max: [u8; 3]) -> SubBox {
    SubBox {
        min,
        max,
        hidden: FaceMask::NONE,
    }
}

/// Horizontal neighbors that connect to this voxel, in `SIDE_FACES` order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Connections {
    pub neg_x: bool,
    pub pos_x: bool,
    pub neg_z: bool,
    pub pos_z: bool,
}

impl Connections {
    #[inline]
    pub fn any(self) -> bool {
        self.neg_x || self.pos_x || self.neg_z || self.pos_z
    }
}

/// Boxes for `shape` given which side neighbors it connects to.
pub fn custom_boxes(shape: CustomShape, links: Connections) -> Vec<SubBox> {
    match shape {
        CustomShape::Torch => vec![sub([7, 0, 7], [9, 10, 9])],
        CustomShape::Lantern => vec![sub([5, 0, 5], [11, 7, 11]), sub([6, 7, 6], [10, 9, 10])],
        CustomShape::Cactus => vec![sub([1, 0, 1], [15, 16, 15])],
        CustomShape::ChestClosed => vec![chest_body(14, links)],
        CustomShape::ChestOpen => {
            let x_only = Connections {
                neg_z: false,
                pos_z: false,
                ..links
            };
            let mut lid = chest_body(16, x_only);
            lid.min[1] = 10;
            lid.min[2] = 13;
            lid.max[2] = 15;
            vec![chest_body(10, links), lid]
        }
        CustomShape::Fence => fence(links),
        CustomShape::Ladder => vec![sub([0, 0, 0], [16, 16, 1])],
        CustomShape::Slab => vec![sub([0, 0, 0], [16, 8, 16])],
        CustomShape::Stairs => vec![sub([0, 0, 0], [16, 8, 16]), sub([0, 8, 8], [16, 16, 16])],
        CustomShape::Sign => vec![sub([7, 0, 7], [9, 9, 9]), sub([1, 9, 7], [15, 16, 9])],
        CustomShape::Trapdoor { open: false } => vec![sub([0, 0, 0], [16, 3, 16])],
        CustomShape::Trapdoor { open: true } => vec![sub([0, 0, 13], [16, 16, 16])],
        CustomShape::Bed => vec![sub([0, 0, 0], [16, 9, 16])],
        // both halves share a slab; the half only selects tiles
        CustomShape::Door { open, .. } => {
            if open {
                vec![sub([0, 0, 0], [3, 16, 16])]
            } else {
                vec![sub([0, 0, 0], [16, 16, 3])]
            }
        }
        CustomShape::LilyPad => vec![sub([0, 0, 0], [16, 1, 16])],
    }
}

/// Chest body inset by one step, stretched to the voxel edge toward paired chests.
/// The shared face is hidden so a pair reads as one box.
fn chest_body(height: u8, links: Connections) -> SubBox {
    let mut b = sub([1, 0, 1], [15, height, 15]);
    if links.neg_x {
        b.min[0] = 0;
        b.hidden = b.hidden.with(Face::NegX);
    }
    if links.pos_x {
        b.max[0] = 16;
        b.hidden = b.hidden.with(Face::PosX);
    }
    if links.neg_z {
        b.min[2] = 0;
        b.hidden = b.hidden.with(Face::NegZ);
    }
    if links.pos_z {
        b.max[2] = 16;
        b.hidden = b.hidden.with(Face::PosZ);
    }
    b
}

fn fence(links: Connections) -> Vec<SubBox> {
    let mut out = vec![sub([6, 0, 6], [10, 16, 10])];
    for (y0, y1) in [(6u8, 9u8), (12, 15)] {
        if links.neg_x {
            out.push(sub([0, y0, 7], [6, y1, 9]));
        }
        if links.pos_x {
            out.push(sub([10, y0, 7], [16, y1, 9]));
        }
        if links.neg_z {
            out.push(sub([7, y0, 0], [9, y1, 6]));
        }
        if links.pos_z {
            out.push(sub([7, y0, 10], [9, y1, 16]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubeworld_blocks::DoorHalf;

    #[test]
    fn boxes_stay_inside_the_voxel() {
        let all = Connections {
            neg_x: true,
            pos_x: true,
            neg_z: true,
            pos_z: true,
        };
        let shapes = [
            CustomShape::Torch,
            CustomShape::Lantern,
            CustomShape::Cactus,
            CustomShape::ChestClosed,
            CustomShape::ChestOpen,
            CustomShape::Fence,
            CustomShape::Ladder,
            CustomShape::Slab,
            CustomShape::Stairs,
            CustomShape::Sign,
            CustomShape::Trapdoor { open: true },
            CustomShape::Bed,
            CustomShape::Door {
                half: DoorHalf::Bottom,
                open: false,
            },
            CustomShape::LilyPad,
        ];
        for shape in shapes {
            for links in [Connections::default(), all] {
                for b in custom_boxes(shape, links) {
                    for a in 0..3 {
                        assert!(b.min[a] < b.max[a] && b.max[a] <= 16, "{shape:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn paired_chest_reaches_the_shared_edge() {
        let links = Connections {
            pos_x: true,
            ..Connections::default()
        };
        let b = custom_boxes(CustomShape::ChestClosed, links)[0];
        assert_eq!(b.max[0], 16);
        assert_eq!(b.min[0], 1);
        assert!(b.hidden.contains(Face::PosX));
        assert!(!b.hidden.contains(Face::NegX));
    }

    #[test]
    fn fence_grows_two_rails_per_link() {
        let links = Connections {
            neg_z: true,
            ..Connections::default()
        };
        assert_eq!(custom_boxes(CustomShape::Fence, links).len(), 3);
        assert!(links.any());
    }
}
