//! Force-directed layout
//!
//! A tick-based simulation in the style of d3-force: links pull connected
//! nodes toward a target distance, every pair of nodes repels, overlapping
//! nodes are pushed apart to a minimum radius and the whole system is kept
//! centred on the canvas. The simulation cools over time (alpha) and can be
//! reheated while a node is dragged. Pins only last for the drag.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

use super::types::ResourceGraph;

/// Tunables for [`ForceLayout`]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct LayoutConfig {
    pub width: f64,
    pub height: f64,
    /// Target length of every link
    pub link_distance: f64,
    /// Many-body strength, negative repels
    pub charge_strength: f64,
    /// Minimum separation radius per node
    pub collide_radius: f64,
    pub alpha_min: f64,
    pub alpha_decay: f64,
    pub velocity_decay: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 500.0,
            link_distance: 100.0,
            charge_strength: -300.0,
            collide_radius: 50.0,
            alpha_min: 0.001,
            // reach alpha_min from 1 in ~300 ticks
            alpha_decay: 1.0 - 0.001_f64.powf(1.0 / 300.0),
            velocity_decay: 0.4,
        }
    }
}

/// Final or intermediate position of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NodePosition {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone)]
struct Body {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    fx: Option<f64>,
    fy: Option<f64>,
}

#[derive(Debug, Clone)]
struct Spring {
    source: usize,
    target: usize,
    strength: f64,
    bias: f64,
}

const DRAG_ALPHA_TARGET: f64 = 0.3;
const INITIAL_RADIUS: f64 = 10.0;

/// Incremental force simulation over a [`ResourceGraph`]
#[derive(Debug, Clone)]
pub struct ForceLayout {
    config: LayoutConfig,
    ids: Vec<String>,
    index: HashMap<String, usize>,
    bodies: Vec<Body>,
    springs: Vec<Spring>,
    alpha: f64,
    alpha_target: f64,
}

impl ForceLayout {
    pub fn new(graph: &ResourceGraph, config: LayoutConfig) -> Self {
        let ids: Vec<String> = graph.nodes.iter().map(|n| n.id.clone()).collect();
        let index: HashMap<String, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        // phyllotaxis arrangement around the canvas centre
        let golden_angle = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
        let (cx, cy) = (config.width / 2.0, config.height / 2.0);
        let bodies = (0..ids.len())
            .map(|i| {
                let radius = INITIAL_RADIUS * (0.5 + i as f64).sqrt();
                let angle = i as f64 * golden_angle;
                Body {
                    x: cx + radius * angle.cos(),
                    y: cy + radius * angle.sin(),
                    vx: 0.0,
                    vy: 0.0,
                    fx: None,
                    fy: None,
                }
            })
            .collect();

        let pairs: Vec<(usize, usize)> = graph
            .edges
            .iter()
            .filter_map(|e| {
                let s = *index.get(&e.source)?;
                let t = *index.get(&e.target)?;
                (s != t).then_some((s, t))
            })
            .collect();

        let mut degree = vec![0usize; ids.len()];
        for &(s, t) in &pairs {
            degree[s] += 1;
            degree[t] += 1;
        }

        let springs = pairs
            .into_iter()
            .map(|(s, t)| Spring {
                source: s,
                target: t,
                strength: 1.0 / degree[s].min(degree[t]) as f64,
                bias: degree[s] as f64 / (degree[s] + degree[t]) as f64,
            })
            .collect();

        Self {
            config,
            ids,
            index,
            bodies,
            springs,
            alpha: 1.0,
            alpha_target: 0.0,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn is_settled(&self) -> bool {
        self.alpha < self.config.alpha_min
    }

    /// Advance one step. Returns false once the simulation has cooled.
    pub fn tick(&mut self) -> bool {
        if self.bodies.is_empty() {
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;

        self.apply_links();
        self.apply_many_body();
        self.apply_collisions();
        self.apply_center();
        self.integrate();

        !self.is_settled()
    }

    /// Run until cooled or `max_ticks` steps
    pub fn run(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && self.tick() {
            ticks += 1;
        }
        ticks
    }

    /// Pin a node at a fixed position
    pub fn pin(&mut self, id: &str, x: f64, y: f64) -> bool {
        match self.index.get(id) {
            Some(&i) => {
                let body = &mut self.bodies[i];
                body.fx = Some(x);
                body.fy = Some(y);
                body.x = x;
                body.y = y;
                true
            }
            None => false,
        }
    }

    pub fn unpin(&mut self, id: &str) -> bool {
        match self.index.get(id) {
            Some(&i) => {
                self.bodies[i].fx = None;
                self.bodies[i].fy = None;
                true
            }
            None => false,
        }
    }

    pub fn is_pinned(&self, id: &str) -> bool {
        self.index
            .get(id)
            .is_some_and(|&i| self.bodies[i].fx.is_some() || self.bodies[i].fy.is_some())
    }

    /// Start dragging: pin where the node is and reheat
    pub fn drag_start(&mut self, id: &str) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        let (x, y) = (self.bodies[i].x, self.bodies[i].y);
        self.alpha_target = DRAG_ALPHA_TARGET;
        if self.alpha < DRAG_ALPHA_TARGET {
            self.alpha = DRAG_ALPHA_TARGET;
        }
        self.pin(id, x, y)
    }

    pub fn drag_to(&mut self, id: &str, x: f64, y: f64) -> bool {
        self.pin(id, x, y)
    }

    /// Release the node; it keeps its spot but is free to move again
    pub fn drag_end(&mut self, id: &str) -> bool {
        self.alpha_target = 0.0;
        self.unpin(id)
    }

    pub fn position(&self, id: &str) -> Option<(f64, f64)> {
        self.index.get(id).map(|&i| (self.bodies[i].x, self.bodies[i].y))
    }

    pub fn positions(&self) -> Vec<NodePosition> {
        self.ids
            .iter()
            .zip(&self.bodies)
            .map(|(id, b)| NodePosition {
                id: id.clone(),
                x: b.x,
                y: b.y,
            })
            .collect()
    }

    fn apply_links(&mut self) {
        let distance = self.config.link_distance;
        for spring in &self.springs {
            let (s, t) = (&self.bodies[spring.source], &self.bodies[spring.target]);
            let mut dx = t.x + t.vx - s.x - s.vx;
            let mut dy = t.y + t.vy - s.y - s.vy;
            if dx == 0.0 && dy == 0.0 {
                dx = jiggle(spring.target);
                dy = jiggle(spring.source);
            }
            let len = (dx * dx + dy * dy).sqrt();
            let k = (len - distance) / len * self.alpha * spring.strength;
            let (dx, dy) = (dx * k, dy * k);

            let target = &mut self.bodies[spring.target];
            target.vx -= dx * spring.bias;
            target.vy -= dy * spring.bias;
            let source = &mut self.bodies[spring.source];
            source.vx += dx * (1.0 - spring.bias);
            source.vy += dy * (1.0 - spring.bias);
        }
    }

    fn apply_many_body(&mut self) {
        let strength = self.config.charge_strength * self.alpha;
        let n = self.bodies.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let mut dx = self.bodies[j].x - self.bodies[i].x;
                let mut dy = self.bodies[j].y - self.bodies[i].y;
                if dx == 0.0 && dy == 0.0 {
                    dx = jiggle(j);
                    dy = jiggle(i);
                }
                // clamp close encounters to keep forces finite
                let dist2 = (dx * dx + dy * dy).max(1.0);
                let (fx, fy) = (dx * strength / dist2, dy * strength / dist2);

                self.bodies[i].vx += fx;
                self.bodies[i].vy += fy;
                self.bodies[j].vx -= fx;
                self.bodies[j].vy -= fy;
            }
        }
    }

    fn apply_collisions(&mut self) {
        let min_dist = self.config.collide_radius * 2.0;
        let n = self.bodies.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (&self.bodies[i], &self.bodies[j]);
                let mut dx = (b.x + b.vx) - (a.x + a.vx);
                let mut dy = (b.y + b.vy) - (a.y + a.vy);
                let mut dist2 = dx * dx + dy * dy;
                if dist2 >= min_dist * min_dist {
                    continue;
                }
                if dist2 == 0.0 {
                    dx = jiggle(j);
                    dy = jiggle(i);
                    dist2 = dx * dx + dy * dy;
                }
                let dist = dist2.sqrt();
                let push = (min_dist - dist) / dist * 0.5;
                let (px, py) = (dx * push, dy * push);

                self.bodies[i].vx -= px * 0.5;
                self.bodies[i].vy -= py * 0.5;
                self.bodies[j].vx += px * 0.5;
                self.bodies[j].vy += py * 0.5;
            }
        }
    }

    fn apply_center(&mut self) {
        let n = self.bodies.len() as f64;
        let (sx, sy) = self
            .bodies
            .iter()
            .fold((0.0, 0.0), |(sx, sy), b| (sx + b.x, sy + b.y));
        let shift_x = sx / n - self.config.width / 2.0;
        let shift_y = sy / n - self.config.height / 2.0;
        for body in &mut self.bodies {
            body.x -= shift_x;
            body.y -= shift_y;
        }
    }

    fn integrate(&mut self) {
        let keep = 1.0 - self.config.velocity_decay;
        for body in &mut self.bodies {
            match body.fx {
                Some(fx) => {
                    body.x = fx;
                    body.vx = 0.0;
                }
                None => {
                    body.vx *= keep;
                    body.x += body.vx;
                }
            }
            match body.fy {
                Some(fy) => {
                    body.y = fy;
                    body.vy = 0.0;
                }
                None => {
                    body.vy *= keep;
                    body.y += body.vy;
                }
            }
        }
    }
}

/// Deterministic tiny offset for coincident points
fn jiggle(seed: usize) -> f64 {
    ((seed % 7) as f64 + 1.0) * 1e-6
}

/// Lay out a graph to completion
pub fn layout_graph(graph: &ResourceGraph, config: LayoutConfig, max_ticks: usize) -> Vec<NodePosition> {
    let mut layout = ForceLayout::new(graph, config);
    layout.run(max_ticks);
    layout.positions()
}

/// Pan/zoom transform between world (simulation) and screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Viewport {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }
}

impl Viewport {
    pub const MIN_SCALE: f64 = 0.1;
    pub const MAX_SCALE: f64 = 4.0;

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.translate_x += dx;
        self.translate_y += dy;
    }

    /// Zoom by `factor` keeping the screen point (`sx`, `sy`) fixed
    pub fn zoom_at(&mut self, factor: f64, sx: f64, sy: f64) {
        let (wx, wy) = self.to_world(sx, sy);
        self.scale = (self.scale * factor).clamp(Self::MIN_SCALE, Self::MAX_SCALE);
        self.translate_x = sx - wx * self.scale;
        self.translate_y = sy - wy * self.scale;
    }

    pub fn to_screen(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.scale + self.translate_x,
            y * self.scale + self.translate_y,
        )
    }

    pub fn to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        (
            (sx - self.translate_x) / self.scale,
            (sy - self.translate_y) / self.scale,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::{GraphNode, Relation};

    fn chain(n: usize) -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        for i in 0..n {
            graph.add_node_if_absent(GraphNode::new(format!("n{}", i), format!("n{}", i), "pod"));
        }
        for i in 1..n {
            graph.add_edge(&format!("n{}", i - 1), &format!("n{}", i), Relation::Manages);
        }
        graph
    }

    #[test]
    fn test_empty_layout() {
        let mut layout = ForceLayout::new(&ResourceGraph::new(), LayoutConfig::default());
        assert!(!layout.tick());
        assert!(layout.positions().is_empty());
    }

    #[test]
    fn test_simulation_cools_down() {
        let mut layout = ForceLayout::new(&chain(5), LayoutConfig::default());
        let ticks = layout.run(1000);
        assert!(layout.is_settled());
        assert!(ticks < 1000);
    }

    #[test]
    fn test_drag_pins_then_releases() {
        let mut layout = ForceLayout::new(&chain(4), LayoutConfig::default());
        layout.run(50);

        assert!(layout.drag_start("n2"));
        assert!(layout.alpha() >= DRAG_ALPHA_TARGET);
        layout.drag_to("n2", 10.0, 20.0);
        for _ in 0..20 {
            layout.tick();
        }
        assert_eq!(layout.position("n2"), Some((10.0, 20.0)));
        assert!(layout.is_pinned("n2"));

        layout.drag_end("n2");
        assert!(!layout.is_pinned("n2"));
        for _ in 0..20 {
            layout.tick();
        }
        assert_ne!(layout.position("n2"), Some((10.0, 20.0)));
    }

    #[test]
    fn test_unknown_node_operations() {
        let mut layout = ForceLayout::new(&chain(2), LayoutConfig::default());
        assert!(!layout.drag_start("nope"));
        assert!(!layout.pin("nope", 0.0, 0.0));
        assert_eq!(layout.position("nope"), None);
    }

    #[test]
    fn test_viewport_zoom_clamps_and_keeps_anchor() {
        let mut viewport = Viewport::default();
        viewport.pan(30.0, -10.0);

        let anchor = viewport.to_world(100.0, 100.0);
        viewport.zoom_at(2.0, 100.0, 100.0);
        let (sx, sy) = viewport.to_screen(anchor.0, anchor.1);
        assert!((sx - 100.0).abs() < 1e-9);
        assert!((sy - 100.0).abs() < 1e-9);

        viewport.zoom_at(100.0, 0.0, 0.0);
        assert_eq!(viewport.scale, Viewport::MAX_SCALE);
        viewport.zoom_at(1e-6, 0.0, 0.0);
        assert_eq!(viewport.scale, Viewport::MIN_SCALE);
    }
}
