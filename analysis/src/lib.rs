//! This crate contains a set of helpers to build static analysis tools based
//! on [monotone dataflow frameworks](https://en.wikipedia.org/wiki/Data-flow_analysis).
//! The building blocks include helpers for
//! [control flow graphs](https://en.wikipedia.org/wiki/Control-flow_graph)
//! with labelled edges, [lattice](https://en.wikipedia.org/wiki/Lattice_(order))
//! domains, worklist based fixed-point solvers for intra- and
//! inter-procedural analyses, and an incrementally built call graph.
//! There are also a set of concrete lattice implementations like the bit set
//! lattice, the map lattice, and the flat lattice of integer constants.
//!
//! The building blocks are independent of the analysed language. Look at the
//! jir-lib crate for an example how to define analyses using the helpers in
//! this crate.
//!
//! Some resources to learn more about static analysis:
//! * [Static Program Analysis, Anders Møller and Michael I. Schwartzbach](https://cs.au.dk/~amoeller/spa/)
//! * [Introduction to Static Analysis, Xavier Rival and Kwangkeun Yi](https://mitpress.mit.edu/9780262043410/introduction-to-static-analysis/)
//! * [Data Flow Analysis: Theory and Practice](https://www.amazon.com/Data-Flow-Analysis-Theory-Practice/dp/0849328802)
//! * [Pointer Analysis, Yannis Smaragdakis and George Balatsouras](https://yanniss.github.io/points-to-tutorial15.pdf)
//!
//! Frameworks:
//! * [Tai-e](https://github.com/pascal-lab/Tai-e)
//! * [Soot](https://github.com/soot-oss/soot)
//! * [Doop](https://bitbucket.org/yanniss/doop)
//! * [SPARTA](https://github.com/facebook/SPARTA)

/// Collection of commonly used graph algorithms that are independent of the
/// actual operations, only based on the shape of the control flow graph.
pub mod analyses;

/// A call graph built incrementally, generic over call sites and methods.
pub mod callgraph;

/// Trait for defining a control flow graph, and some algorithms and data
/// structures to make it easier to work with them.
pub mod cfg;

/// A curated collection of semi-lattices and lattices, including some
/// transformers to help building larger lattices from smaller ones.
pub mod domains;

/// Implementations of fixed-point iteration algorithms using worklists.
pub mod solvers;



#[cfg(test)]
mod solvers_tests;
