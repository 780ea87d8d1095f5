use crate::archive::{InputArchive, OutputArchive};
use crate::binding::{Load, Save};
use crate::error::Result;
use crate::format::NodeKind;

// Tuples are fixed arrays of unnamed elements.
macro_rules! impl_tuple {
    ($($name:ident . $index:tt),+) => {
        impl<$($name: Save),+> Save for ($($name,)+) {
            const NODE: NodeKind = NodeKind::Array;

            fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
                $( ar.save(&self.$index)?; )+
                Ok(())
            }
        }

        impl<$($name: Load),+> Load for ($($name,)+) {
            const NODE: NodeKind = NodeKind::Array;

            fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
                Ok(($( { let value: $name = ar.load()?; value }, )+))
            }
        }
    };
}

impl_tuple!(A.0);
impl_tuple!(A.0, B.1);
impl_tuple!(A.0, B.1, C.2);
impl_tuple!(A.0, B.1, C.2, D.3);
impl_tuple!(A.0, B.1, C.2, D.3, E.4);
impl_tuple!(A.0, B.1, C.2, D.3, E.4, F.5);
impl_tuple!(A.0, B.1, C.2, D.3, E.4, F.5, G.6);
impl_tuple!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7);
impl_tuple!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8);
impl_tuple!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8, J.9);
impl_tuple!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8, J.9, K.10);
impl_tuple!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8, J.9, K.10, L.11);
