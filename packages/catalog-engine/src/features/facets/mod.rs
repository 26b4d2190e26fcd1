//! Facet counting over a search's filter state

pub mod computer;
pub mod domain;

pub use computer::FacetComputer;
pub use domain::{
    AttributeFacet, FacetDimension, FacetOutcome, FacetSelection, FacetSet, FacetValue,
    ValueOutcome,
};
