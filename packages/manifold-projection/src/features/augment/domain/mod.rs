mod members;
mod naming;

pub use members::{
    Augmentation, FieldAdjustment, GenerationKind, HolderType, MemberBody, MemberKind, Origin,
    PropertyAccess, SyntheticMember,
};
pub use naming::{capitalize, decapitalize, derive_property_name, is_reserved_word, AccessorPrefix};
