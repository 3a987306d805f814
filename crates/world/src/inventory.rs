//! Inventory system for player storage.
//!
//! Provides a 36-slot inventory of shared [`ItemStack`]s with stack merging
//! and removal. Stacks are shared handles, so a stack fetched through a chain
//! and modified there changes the inventory slot it came from.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use mdinspect_core::{
    arg, object, receiver, reflect_enum, ArrayList, Class, Method, Object, Reflect, Value,
    BOOLEAN, INT, LIST, STRING,
};
use serde::{Deserialize, Serialize};

/// Maximum stack size for most items.
pub const DEFAULT_STACK_SIZE: u8 = 64;

/// Number of slots in player inventory.
pub const INVENTORY_SIZE: usize = 36;

/// Block and item types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Material {
    /// Empty space.
    #[default]
    Air,
    /// Stone.
    Stone,
    /// Dirt.
    Dirt,
    /// Grass block.
    GrassBlock,
    /// Cobblestone.
    Cobblestone,
    /// Oak log.
    OakLog,
    /// Sand.
    Sand,
    /// Water source.
    Water,
    /// Netherrack.
    Netherrack,
    /// Diamond gem.
    Diamond,
    /// Ender pearl.
    EnderPearl,
    /// Diamond sword.
    DiamondSword,
}

reflect_enum!(Material, MATERIAL, "Material", "world::Material", {
    Air => "AIR",
    Stone => "STONE",
    Dirt => "DIRT",
    GrassBlock => "GRASS_BLOCK",
    Cobblestone => "COBBLESTONE",
    OakLog => "OAK_LOG",
    Sand => "SAND",
    Water => "WATER",
    Netherrack => "NETHERRACK",
    Diamond => "DIAMOND",
    EnderPearl => "ENDER_PEARL",
    DiamondSword => "DIAMOND_SWORD",
});

impl Material {
    /// Maximum number of items per stack.
    pub fn max_stack_size(self) -> u8 {
        match self {
            Self::DiamondSword => 1,
            Self::EnderPearl => 16,
            _ => DEFAULT_STACK_SIZE,
        }
    }

    /// Whether the material can be placed as a block.
    pub fn is_block(self) -> bool {
        !matches!(self, Self::Diamond | Self::EnderPearl | Self::DiamondSword)
    }

    /// Whether a block of this material is empty space.
    pub fn is_air(self) -> bool {
        self == Self::Air
    }
}

/// Runtime class of [`ItemStack`].
pub static ITEM_STACK: Class = Class::new("ItemStack", "world::ItemStack").with_methods(item_stack_methods);
/// Runtime class of [`Inventory`].
pub static INVENTORY: Class = Class::new("Inventory", "world::Inventory").with_methods(inventory_methods);

/// Represents a stack of items in an inventory slot.
#[derive(Debug)]
pub struct ItemStack {
    material: Material,
    count: Cell<u8>,
}

impl ItemStack {
    /// Create a new item stack, clamped to the material's stack size.
    pub fn new(material: Material, count: u8) -> Self {
        Self {
            material,
            count: Cell::new(count.min(material.max_stack_size())),
        }
    }

    /// Item type of this stack.
    pub fn material(&self) -> Material {
        self.material
    }

    /// Number of items in this stack.
    pub fn count(&self) -> u8 {
        self.count.get()
    }

    /// Set the number of items, clamped to the stack size.
    pub fn set_count(&self, count: u8) {
        self.count.set(count.min(self.max_stack_size()));
    }

    /// Check if this stack can merge with another stack.
    pub fn can_merge(&self, other: &ItemStack) -> bool {
        self.material == other.material
    }

    /// Maximum stack size for this item.
    pub fn max_stack_size(&self) -> u8 {
        self.material.max_stack_size()
    }

    /// Check if this stack is at max capacity.
    pub fn is_full(&self) -> bool {
        self.count() >= self.max_stack_size()
    }

    /// Try to add items to this stack, returning the amount that didn't fit.
    pub fn add(&self, amount: u8) -> u8 {
        let space = self.max_stack_size().saturating_sub(self.count());
        let added = amount.min(space);
        self.count.set(self.count() + added);
        amount - added
    }

    /// Try to remove items from this stack, returning the amount actually removed.
    pub fn remove(&self, amount: u8) -> u8 {
        let removed = amount.min(self.count());
        self.count.set(self.count() - removed);
        removed
    }
}

impl Reflect for ItemStack {
    fn class(&self) -> &'static Class {
        &ITEM_STACK
    }

    fn to_text(&self) -> String {
        format!("{}x{}", self.count(), mdinspect_core::EnumConstant::name(&self.material))
    }
}

/// Player inventory with a fixed number of slots.
#[derive(Debug)]
pub struct Inventory {
    slots: RefCell<Vec<Option<Rc<ItemStack>>>>,
}

impl Inventory {
    /// Create a new empty inventory.
    pub fn new() -> Self {
        Self {
            slots: RefCell::new(vec![None; INVENTORY_SIZE]),
        }
    }

    /// Number of slots.
    pub fn size(&self) -> usize {
        INVENTORY_SIZE
    }

    /// Get the stack in a slot.
    pub fn get(&self, slot: usize) -> Option<Rc<ItemStack>> {
        self.slots.borrow().get(slot).cloned().flatten()
    }

    /// Set a slot. Returns false when the slot is out of range.
    pub fn set(&self, slot: usize, stack: Option<Rc<ItemStack>>) -> bool {
        match self.slots.borrow_mut().get_mut(slot) {
            Some(entry) => {
                *entry = stack;
                true
            }
            None => false,
        }
    }

    /// Add items, merging with existing stacks first.
    /// Returns the number of items that did not fit.
    pub fn add_item(&self, material: Material, mut count: u8) -> u8 {
        let mut slots = self.slots.borrow_mut();
        for existing in slots.iter().flatten() {
            if count == 0 {
                return 0;
            }
            if existing.material() == material && !existing.is_full() {
                count = existing.add(count);
            }
        }
        for slot in slots.iter_mut() {
            if count == 0 {
                break;
            }
            if slot.is_none() {
                let placed = count.min(material.max_stack_size());
                *slot = Some(Rc::new(ItemStack::new(material, placed)));
                count -= placed;
            }
        }
        count
    }

    /// Remove up to `amount` items of a material. Returns the amount removed.
    pub fn remove_item(&self, material: Material, amount: u32) -> u32 {
        let mut remaining = amount;
        for slot in self.slots.borrow_mut().iter_mut() {
            if remaining == 0 {
                break;
            }
            let Some(stack) = slot.as_ref() else { continue };
            if stack.material() != material {
                continue;
            }
            let take = u8::try_from(remaining).unwrap_or(u8::MAX);
            remaining -= u32::from(stack.remove(take));
            if stack.count() == 0 {
                *slot = None;
            }
        }
        amount - remaining
    }

    /// Count the total number of a material in the inventory.
    pub fn count_item(&self, material: Material) -> u32 {
        self.slots
            .borrow()
            .iter()
            .flatten()
            .filter(|stack| stack.material() == material)
            .map(|stack| u32::from(stack.count()))
            .sum()
    }

    /// First empty slot, if any.
    pub fn first_empty(&self) -> Option<usize> {
        self.slots.borrow().iter().position(Option::is_none)
    }

    /// Non-empty stacks in slot order.
    pub fn contents(&self) -> Vec<(usize, Rc<ItemStack>)> {
        self.slots
            .borrow()
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.clone().map(|stack| (i, stack)))
            .collect()
    }

    /// Check if the inventory is completely empty.
    pub fn is_empty(&self) -> bool {
        self.slots.borrow().iter().all(Option::is_none)
    }

    /// Empty every slot.
    pub fn clear(&self) {
        self.slots.borrow_mut().iter_mut().for_each(|slot| *slot = None);
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

impl Reflect for Inventory {
    fn class(&self) -> &'static Class {
        &INVENTORY
    }

    fn to_text(&self) -> String {
        format!("Inventory({} stacks)", self.contents().len())
    }
}

fn slot_index(args: &[Value], index: usize) -> anyhow::Result<usize> {
    let slot = *arg::<i32>(args, index, &INT)?;
    usize::try_from(slot)
        .ok()
        .filter(|s| *s < INVENTORY_SIZE)
        .ok_or_else(|| anyhow::anyhow!("slot {slot} out of range 0..{INVENTORY_SIZE}"))
}

fn clamp_count(count: i32) -> u8 {
    u8::try_from(count.max(0)).unwrap_or(u8::MAX)
}

fn item_stack_methods() -> Vec<Method> {
    vec![
        Method::new(&ITEM_STACK, "getType", |recv, _| {
            Ok(Some(object(receiver::<ItemStack>(recv, &ITEM_STACK)?.material())))
        })
        .returns(&MATERIAL),
        Method::new(&ITEM_STACK, "getAmount", |recv, _| {
            Ok(Some(object(i32::from(receiver::<ItemStack>(recv, &ITEM_STACK)?.count()))))
        })
        .returns(&INT),
        Method::new(&ITEM_STACK, "setAmount", |recv, args| {
            let count = *arg::<i32>(args, 0, &INT)?;
            receiver::<ItemStack>(recv, &ITEM_STACK)?.set_count(clamp_count(count));
            Ok(None)
        })
        .params(&[&INT]),
        Method::new(&ITEM_STACK, "getMaxStackSize", |recv, _| {
            Ok(Some(object(i32::from(receiver::<ItemStack>(recv, &ITEM_STACK)?.max_stack_size()))))
        })
        .returns(&INT),
        Method::new(&ITEM_STACK, "isSimilar", |recv, args| {
            let stack = receiver::<ItemStack>(recv, &ITEM_STACK)?;
            let other = arg::<ItemStack>(args, 0, &ITEM_STACK)?;
            Ok(Some(object(stack.can_merge(other))))
        })
        .params(&[&ITEM_STACK])
        .returns(&BOOLEAN),
    ]
}

fn inventory_methods() -> Vec<Method> {
    vec![
        Method::new(&INVENTORY, "getSize", |recv, _| {
            Ok(Some(object(receiver::<Inventory>(recv, &INVENTORY)?.size() as i32)))
        })
        .returns(&INT),
        Method::new(&INVENTORY, "getItem", |recv, args| {
            let inventory = receiver::<Inventory>(recv, &INVENTORY)?;
            let slot = slot_index(args, 0)?;
            Ok(inventory.get(slot).map(|stack| stack as Object))
        })
        .params(&[&INT])
        .returns(&ITEM_STACK),
        Method::new(&INVENTORY, "setItem", |recv, args| {
            let inventory = receiver::<Inventory>(recv, &INVENTORY)?;
            let slot = slot_index(args, 0)?;
            let stack = match &args[1] {
                Some(_) => {
                    let given = arg::<ItemStack>(args, 1, &ITEM_STACK)?;
                    Some(Rc::new(ItemStack::new(given.material(), given.count())))
                }
                None => None,
            };
            inventory.set(slot, stack);
            Ok(None)
        })
        .params(&[&INT, &ITEM_STACK]),
        Method::new(&INVENTORY, "addItem", |recv, args| {
            let inventory = receiver::<Inventory>(recv, &INVENTORY)?;
            let stack = arg::<ItemStack>(args, 0, &ITEM_STACK)?;
            let leftover = inventory.add_item(stack.material(), stack.count());
            Ok(Some(object(i32::from(leftover))))
        })
        .params(&[&ITEM_STACK])
        .returns(&INT),
        Method::new(&INVENTORY, "removeItem", |recv, args| {
            let inventory = receiver::<Inventory>(recv, &INVENTORY)?;
            let material = *arg::<Material>(args, 0, &MATERIAL)?;
            let amount = u32::try_from(*arg::<i32>(args, 1, &INT)?).unwrap_or_default();
            Ok(Some(object(inventory.remove_item(material, amount) as i32)))
        })
        .params(&[&MATERIAL, &INT])
        .returns(&INT),
        Method::new(&INVENTORY, "contains", |recv, args| {
            let inventory = receiver::<Inventory>(recv, &INVENTORY)?;
            let material = *arg::<Material>(args, 0, &MATERIAL)?;
            Ok(Some(object(inventory.count_item(material) > 0)))
        })
        .params(&[&MATERIAL])
        .returns(&BOOLEAN),
        Method::new(&INVENTORY, "count", |recv, args| {
            let inventory = receiver::<Inventory>(recv, &INVENTORY)?;
            let material = *arg::<Material>(args, 0, &MATERIAL)?;
            Ok(Some(object(inventory.count_item(material) as i32)))
        })
        .params(&[&MATERIAL])
        .returns(&INT),
        Method::new(&INVENTORY, "firstEmpty", |recv, _| {
            let inventory = receiver::<Inventory>(recv, &INVENTORY)?;
            let slot = inventory.first_empty().map_or(-1, |s| s as i32);
            Ok(Some(object(slot)))
        })
        .returns(&INT),
        Method::new(&INVENTORY, "isEmpty", |recv, _| {
            Ok(Some(object(receiver::<Inventory>(recv, &INVENTORY)?.is_empty())))
        })
        .returns(&BOOLEAN),
        Method::new(&INVENTORY, "getContents", |recv, _| {
            let inventory = receiver::<Inventory>(recv, &INVENTORY)?;
            let stacks = inventory.contents().into_iter().map(|(_, stack)| stack as Object);
            Ok(Some(object(ArrayList::of(stacks))))
        })
        .returns(&LIST),
        Method::new(&INVENTORY, "clear", |recv, _| {
            receiver::<Inventory>(recv, &INVENTORY)?.clear();
            Ok(None)
        }),
        Method::new(&INVENTORY, "describe", |recv, _| {
            Ok(Some(object(receiver::<Inventory>(recv, &INVENTORY)?.to_text())))
        })
        .returns(&STRING),
    ]
}
