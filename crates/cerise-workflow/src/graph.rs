use std::collections::{HashMap, HashSet};

/// Step-to-step graph structure for traversal and analysis.
///
/// Terminal markers are not nodes; an edge into `Succeeded` or `Failed`
/// simply does not appear here.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Step names in registration order.
  nodes: Vec<String>,
  /// Adjacency list: step -> list of downstream steps.
  adjacency: HashMap<String, Vec<String>>,
  /// Reverse adjacency: step -> list of upstream steps.
  reverse_adjacency: HashMap<String, Vec<String>>,
}

impl Graph {
  /// Build a graph from step names and (from, to) step edges.
  pub fn new(nodes: &[String], edges: &[(String, String)]) -> Self {
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();

    for node in nodes {
      adjacency.entry(node.clone()).or_default();
      reverse_adjacency.entry(node.clone()).or_default();
    }

    for (from, to) in edges {
      adjacency.entry(from.clone()).or_default().push(to.clone());
      reverse_adjacency
        .entry(to.clone())
        .or_default()
        .push(from.clone());
    }

    Self {
      nodes: nodes.to_vec(),
      adjacency,
      reverse_adjacency,
    }
  }

  /// Get downstream steps for a given step.
  pub fn downstream(&self, node: &str) -> &[String] {
    self
      .adjacency
      .get(node)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Get upstream steps for a given step.
  pub fn upstream(&self, node: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(node)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// All steps reachable from `start`, including `start`.
  pub fn reachable_from(&self, start: &str) -> HashSet<String> {
    let mut visited = HashSet::new();
    let mut stack = vec![start.to_string()];

    while let Some(current) = stack.pop() {
      if visited.insert(current.clone()) {
        for next in self.downstream(&current) {
          if !visited.contains(next) {
            stack.push(next.clone());
          }
        }
      }
    }

    visited
  }

  /// Find a cycle using DFS, returning its steps in order with the first
  /// step repeated at the end.
  pub fn find_cycle(&self) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
      White,
      Gray,
      Black,
    }

    fn dfs<'a>(
      node: &'a str,
      graph: &'a Graph,
      color: &mut HashMap<&'a str, Color>,
      path: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
      color.insert(node, Color::Gray);
      path.push(node);

      for next in graph.downstream(node) {
        match color.get(next.as_str()).copied().unwrap_or(Color::White) {
          Color::Gray => {
            // Back edge: the cycle is the path suffix starting at `next`.
            let start = path.iter().position(|n| *n == next.as_str())?;
            let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
            cycle.push(next.clone());
            return Some(cycle);
          }
          Color::White => {
            if let Some(cycle) = dfs(next, graph, color, path) {
              return Some(cycle);
            }
          }
          Color::Black => {}
        }
      }

      path.pop();
      color.insert(node, Color::Black);
      None
    }

    let mut color: HashMap<&str, Color> = HashMap::new();
    for node in &self.nodes {
      if color.get(node.as_str()).copied().unwrap_or(Color::White) == Color::White {
        let mut path = Vec::new();
        if let Some(cycle) = dfs(node, self, &mut color, &mut path) {
          return Some(cycle);
        }
      }
    }
    None
  }
}
