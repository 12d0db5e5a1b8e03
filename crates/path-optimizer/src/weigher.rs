//! Edge weigher for route search.
//!
//! An edge is viable when its link is active, both endpoint ports carry
//! wavelengths (OMS or fiber-transparent ports), and its physical model
//! yields a positive total span length. The cost of a viable edge is that
//! span length, so shortest-path search minimizes total fiber length.

use tracing::warn;

use optical_model::{Link, LinkModelCatalog, NetworkInventory, PortType};

pub struct FiberSpanWeigher<'a> {
    inventory: &'a NetworkInventory,
    catalog: &'a LinkModelCatalog,
}

fn carries_wavelengths(port_type: Option<PortType>) -> bool {
    matches!(port_type, Some(PortType::Oms) | Some(PortType::Fiber))
}

impl<'a> FiberSpanWeigher<'a> {
    pub fn new(inventory: &'a NetworkInventory, catalog: &'a LinkModelCatalog) -> Self {
        FiberSpanWeigher { inventory, catalog }
    }

    /// Cost of traversing `link`, or `None` when the edge is non-viable.
    pub fn weigh(&self, link: &Link) -> Option<f64> {
        if !link.is_active() {
            return None;
        }
        if !carries_wavelengths(self.inventory.port_type(&link.src))
            || !carries_wavelengths(self.inventory.port_type(&link.dst))
        {
            return None;
        }
        let model = match self.catalog.link_model(&link.src, &link.dst) {
            Ok(model) => model,
            Err(err) => {
                warn!(link = %link, %err, "link has no usable physical model");
                return None;
            }
        };
        let total_span = model.total_span_m();
        if total_span <= 0.0 {
            return None;
        }
        Some(total_span)
    }
}
