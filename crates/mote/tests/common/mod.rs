// SPDX-License-Identifier: Apache-2.0
//! Hand-written shapes used across the integration tests.
//!
//! Shape discovery is out of scope for the library, so these play the
//! role a derive macro would fill in an application.
#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use mote::shape::{
    CtorParam, CtorShape, EnumShape, GridShape, MappedShape, ObjectShape, PropertyDef, Shape,
    Shaped, UnionCase, UnionShape,
};
use mote::Error;

/// Plain two-field object, map layout, field construction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Shaped for Point {
    fn shape() -> Shape<Self> {
        Shape::Object(
            ObjectShape::with_default("Point", Point::default)
                .property(
                    PropertyDef::new("x", |p: &Point| &p.x)
                        .with_setter(|p, v| p.x = v)
                        .default_when(|v| *v == 0)
                        .finish(),
                )
                .property(
                    PropertyDef::new("y", |p: &Point| &p.y)
                        .with_setter(|p, v| p.y = v)
                        .default_when(|v| *v == 0)
                        .finish(),
                ),
        )
    }
}

/// Object with a parameterized constructor and required arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub name: String,
    pub age: u32,
}

#[derive(Default)]
pub struct PersonArgs {
    name: Option<String>,
    age: Option<u32>,
}

impl Shaped for Person {
    fn shape() -> Shape<Self> {
        Shape::Object(
            ObjectShape::with_ctor(
                "Person",
                CtorShape::new(PersonArgs::default, |args: PersonArgs| {
                    Ok(Person {
                        name: args.name.unwrap_or_default(),
                        age: args.age.unwrap_or_default(),
                    })
                })
                .param(
                    CtorParam::new("name", |s: &mut PersonArgs, v: String| s.name = Some(v))
                        .required(),
                )
                .param(
                    CtorParam::new("age", |s: &mut PersonArgs, v: u32| s.age = Some(v))
                        .required(),
                ),
            )
            .property(PropertyDef::new("name", |p: &Person| &p.name).finish())
            .property(PropertyDef::new("age", |p: &Person| &p.age).finish()),
        )
    }
}

/// Index-keyed object (array layout).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compact {
    pub id: u32,
    pub label: Option<String>,
    pub weight: f64,
}

impl Shaped for Compact {
    fn shape() -> Shape<Self> {
        Shape::Object(
            ObjectShape::with_default("Compact", Compact::default)
                .property(
                    PropertyDef::new("id", |c: &Compact| &c.id)
                        .with_setter(|c, v| c.id = v)
                        .indexed(0)
                        .finish(),
                )
                .property(
                    PropertyDef::new("label", |c: &Compact| &c.label)
                        .with_setter(|c, v| c.label = v)
                        .indexed(2)
                        .finish(),
                )
                .property(
                    PropertyDef::new("weight", |c: &Compact| &c.weight)
                        .with_setter(|c, v| c.weight = v)
                        .indexed(4)
                        .finish(),
                ),
        )
    }
}

/// Plain enum with declared names.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Color {
    Red,
    Green,
    Blue,
}

impl Shaped for Color {
    fn shape() -> Shape<Self> {
        Shape::Enum(EnumShape {
            type_name: "Color",
            entries: &[("Red", 0), ("Green", 1), ("Blue", 2)],
            to_ordinal: |c| *c as i64,
            from_ordinal: |o| match o {
                0 => Some(Color::Red),
                1 => Some(Color::Green),
                2 => Some(Color::Blue),
                _ => None,
            },
        })
    }
}

/// Alias-discriminated union.
#[derive(Debug, Clone, PartialEq)]
pub enum Animal {
    Dog(Dog),
    Cat(Cat),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dog {
    pub name: String,
    pub volume: u32,
}

impl Shaped for Dog {
    fn shape() -> Shape<Self> {
        Shape::Object(
            ObjectShape::with_default("Dog", Dog::default)
                .property(
                    PropertyDef::new("name", |d: &Dog| &d.name)
                        .with_setter(|d, v| d.name = v)
                        .finish(),
                )
                .property(
                    PropertyDef::new("volume", |d: &Dog| &d.volume)
                        .with_setter(|d, v| d.volume = v)
                        .finish(),
                ),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cat {
    pub name: String,
    pub lives: u32,
}

impl Shaped for Cat {
    fn shape() -> Shape<Self> {
        Shape::Object(
            ObjectShape::with_default("Cat", Cat::default)
                .property(
                    PropertyDef::new("name", |c: &Cat| &c.name)
                        .with_setter(|c, v| c.name = v)
                        .finish(),
                )
                .property(
                    PropertyDef::new("lives", |c: &Cat| &c.lives)
                        .with_setter(|c, v| c.lives = v)
                        .finish(),
                ),
        )
    }
}

fn pick_dog(a: &Animal) -> Option<&Dog> {
    match a {
        Animal::Dog(d) => Some(d),
        Animal::Cat(_) => None,
    }
}

fn pick_cat(a: &Animal) -> Option<&Cat> {
    match a {
        Animal::Cat(c) => Some(c),
        Animal::Dog(_) => None,
    }
}

impl Shaped for Animal {
    fn shape() -> Shape<Self> {
        Shape::Union(
            UnionShape::new("Animal")
                .case(UnionCase::aliased("dog", pick_dog, Animal::Dog).with_code(0))
                .case(UnionCase::aliased("cat", pick_cat, Animal::Cat).with_code(1)),
        )
    }
}

/// Structural union: no aliases, identified by required properties.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Click(Click),
    Key(KeyPress),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Click {
    pub x: i64,
    pub y: i64,
}

impl Shaped for Click {
    fn shape() -> Shape<Self> {
        Shape::Object(
            ObjectShape::with_default("Click", Click::default)
                .property(
                    PropertyDef::new("x", |c: &Click| &c.x)
                        .with_setter(|c, v| c.x = v)
                        .required()
                        .finish(),
                )
                .property(
                    PropertyDef::new("y", |c: &Click| &c.y)
                        .with_setter(|c, v| c.y = v)
                        .required()
                        .finish(),
                ),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyPress {
    pub key: String,
    pub repeat: bool,
}

impl Shaped for KeyPress {
    fn shape() -> Shape<Self> {
        Shape::Object(
            ObjectShape::with_default("KeyPress", KeyPress::default)
                .property(
                    PropertyDef::new("key", |k: &KeyPress| &k.key)
                        .with_setter(|k, v| k.key = v)
                        .required()
                        .finish(),
                )
                .property(
                    PropertyDef::new("repeat", |k: &KeyPress| &k.repeat)
                        .with_setter(|k, v| k.repeat = v)
                        .finish(),
                ),
        )
    }
}

fn pick_click(e: &Event) -> Option<&Click> {
    match e {
        Event::Click(c) => Some(c),
        Event::Key(_) => None,
    }
}

fn pick_key(e: &Event) -> Option<&KeyPress> {
    match e {
        Event::Key(k) => Some(k),
        Event::Click(_) => None,
    }
}

impl Shaped for Event {
    fn shape() -> Shape<Self> {
        Shape::Union(
            UnionShape::new("Event")
                .case(UnionCase::structural("click", pick_click, Event::Click))
                .case(UnionCase::structural("key", pick_key, Event::Key)),
        )
    }
}

/// Recursive tree; its converter construction exercises the delayed
/// placeholder in the cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub value: u32,
    pub children: Vec<Node>,
}

impl Shaped for Node {
    fn shape() -> Shape<Self> {
        Shape::Object(
            ObjectShape::with_default("Node", Node::default)
                .property(
                    PropertyDef::new("value", |n: &Node| &n.value)
                        .with_setter(|n, v| n.value = v)
                        .finish(),
                )
                .property(
                    PropertyDef::new("children", |n: &Node| &n.children)
                        .with_setter(|n, v| n.children = v)
                        .finish(),
                ),
        )
    }
}

impl Node {
    /// A chain of the given number of nodes, each the only child of the
    /// previous one.
    pub fn chain(levels: usize) -> Node {
        let mut node = Node::default();
        for value in 1..levels as u32 {
            node = Node {
                value,
                children: vec![node],
            };
        }
        node
    }
}

/// Two fields that may share one allocation; exercises reference
/// preservation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedPair {
    pub left: Arc<Point>,
    pub right: Arc<Point>,
}

impl Shaped for SharedPair {
    fn shape() -> Shape<Self> {
        Shape::Object(
            ObjectShape::with_default("SharedPair", SharedPair::default)
                .property(
                    PropertyDef::new("left", |p: &SharedPair| &p.left)
                        .with_setter(|p, v| p.left = v)
                        .finish(),
                )
                .property(
                    PropertyDef::new("right", |p: &SharedPair| &p.right)
                        .with_setter(|p, v| p.right = v)
                        .finish(),
                ),
        )
    }
}

/// A write-once link slot, so tests can tie an actual reference cycle.
#[derive(Debug, Default)]
pub struct CycleSlot(pub OnceLock<Arc<Chain>>);

impl Shaped for CycleSlot {
    fn shape() -> Shape<Self> {
        Shape::mapped(MappedShape {
            to: |slot: &CycleSlot| slot.0.get().cloned(),
            from: |linked: Option<Arc<Chain>>| {
                let slot = OnceLock::new();
                if let Some(target) = linked {
                    let _ = slot.set(target);
                }
                Ok(CycleSlot(slot))
            },
        })
    }
}

/// Node of a linked structure that can point back at itself.
#[derive(Debug, Default)]
pub struct Chain {
    pub id: u32,
    pub next: CycleSlot,
}

impl Shaped for Chain {
    fn shape() -> Shape<Self> {
        Shape::Object(
            ObjectShape::with_default("Chain", Chain::default)
                .property(
                    PropertyDef::new("id", |c: &Chain| &c.id)
                        .with_setter(|c, v| c.id = v)
                        .finish(),
                )
                .property(
                    PropertyDef::new("next", |c: &Chain| &c.next)
                        .with_setter(|c, v| c.next = v)
                        .finish(),
                ),
        )
    }
}

/// Rank-2 grid stored row-major.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<i64>,
}

fn matrix_iter(m: &Matrix) -> Box<dyn Iterator<Item = &i64> + '_> {
    Box::new(m.data.iter())
}

impl Shaped for Matrix {
    fn shape() -> Shape<Self> {
        Shape::multi_dim(GridShape {
            rank: 2,
            dims: |m: &Matrix| vec![m.rows, m.cols],
            iter: matrix_iter,
            from_parts: |dims: Vec<usize>, data: Vec<i64>| {
                if dims.len() != 2 || dims[0] * dims[1] != data.len() {
                    return Err(Error::InvalidData {
                        type_name: "Matrix",
                        detail: "dimension mismatch".to_string(),
                    });
                }
                Ok(Matrix {
                    rows: dims[0],
                    cols: dims[1],
                    data,
                })
            },
        })
    }
}
