//! The graph: owner of every block, instruction, and loop in one function,
//! and the root object analyses and optimizations are invoked against.

use cranelift_entity::PrimaryMap;

use super::{BasicBlock, Block, ConstantValue, Inst, Instruction, InstructionData, Loop, LoopData};
use super::{Opcode, PrimitiveType, UseId};
use crate::analysis::{dominator_tree, loop_analysis, rpo};
use crate::marker::MarkerManager;

/// One node of an instruction's user list: an arena-allocated, intrusively
/// doubly-linked record of a single def → use edge, viewed from the def side.
#[derive(Clone, Copy, Debug)]
struct UseNode {
    user: Inst,
    prev: Option<UseId>,
    next: Option<UseId>,
}

/// The hard input-count cap for a fixed-shape opcode, or `None` for the
/// variadic `Phi`/`CallStatic` shapes. Every shape is backed by the same
/// growable container regardless of its cap.
fn max_arity(opcode: Opcode) -> Option<usize> {
    match opcode {
        Opcode::Undefined | Opcode::Jmp | Opcode::Constant | Opcode::Parameter => Some(0),
        Opcode::Add
        | Opcode::Sub
        | Opcode::Mul
        | Opcode::Div
        | Opcode::Rem
        | Opcode::And
        | Opcode::Or
        | Opcode::Xor
        | Opcode::Shr
        | Opcode::Shl
        | Opcode::Ashr
        | Opcode::Beq
        | Opcode::Bne
        | Opcode::Bgt
        | Opcode::LoadArray => Some(2),
        Opcode::NewArr | Opcode::NullCheck | Opcode::Ret => Some(1),
        Opcode::StoreArray | Opcode::BoundsCheck => Some(3),
        Opcode::Phi | Opcode::CallStatic => None,
    }
}

/// Whether a fixed, 2-input opcode is eligible for the "equal inputs share
/// one user edge" exception. Scoped narrowly to arity-2 fixed shapes; `Phi`
/// and `CallStatic` always get one user edge per input slot, even when two
/// slots reference the same def.
fn allows_shared_input_use(opcode: Opcode) -> bool {
    max_arity(opcode) == Some(2)
}

/// One function's worth of IR: every block, instruction, and loop, plus the
/// cached results of the flow analyses run against them.
///
/// All cross-references inside a `Graph` are entity handles ([`Block`],
/// [`Inst`], [`Loop`]); nothing here borrows from anything else, so a `Graph`
/// can be freely moved, and traversals are index lookups rather than pointer
/// chases.
pub struct Graph {
    blocks: PrimaryMap<Block, BasicBlock>,
    instructions: PrimaryMap<Inst, Instruction>,
    uses: PrimaryMap<UseId, UseNode>,
    loops: PrimaryMap<Loop, LoopData>,
    root_loop: Option<Loop>,
    start_block: Option<Block>,
    rpo: Option<Vec<Block>>,
    markers: MarkerManager,
    method_id: u32,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// An empty graph with no blocks, instructions, or loops.
    pub fn new() -> Self {
        Graph {
            blocks: PrimaryMap::new(),
            instructions: PrimaryMap::new(),
            uses: PrimaryMap::new(),
            loops: PrimaryMap::new(),
            root_loop: None,
            start_block: None,
            rpo: None,
            markers: MarkerManager::new(),
            method_id: 0,
        }
    }

    // ---- accessors -----------------------------------------------------

    /// Opaque identifier of the method/function this graph represents.
    pub fn method_id(&self) -> u32 {
        self.method_id
    }

    /// Set the method identifier.
    pub fn set_method_id(&mut self, id: u32) {
        self.method_id = id;
    }

    /// The first block ever created in this graph, by convention the entry
    /// point of the function. `None` for a graph with no blocks yet.
    pub fn start_block(&self) -> Option<Block> {
        self.start_block
    }

    /// Borrow a block's data.
    pub fn block(&self, block: Block) -> &BasicBlock {
        &self.blocks[block]
    }

    /// Number of blocks ever created (including any later removed from the
    /// CFG but still present in the pool).
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Borrow an instruction's data.
    pub fn inst(&self, inst: Inst) -> &Instruction {
        &self.instructions[inst]
    }

    /// Number of instructions ever created.
    pub fn num_instructions(&self) -> usize {
        self.instructions.len()
    }

    /// Borrow a loop's data.
    pub fn loop_data(&self, l: Loop) -> &LoopData {
        &self.loops[l]
    }

    /// Iterate every block ever created, in construction (id) order.
    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        self.blocks.keys()
    }

    /// Iterate every loop ever created, including the root loop.
    pub fn loops(&self) -> impl Iterator<Item = Loop> + '_ {
        self.loops.keys()
    }

    /// The graph's single root/catch-all loop, populated by
    /// [`Graph::run_loop_analysis`].
    pub fn root_loop(&self) -> Option<Loop> {
        self.root_loop
    }

    pub(crate) fn set_root_loop(&mut self, l: Loop) {
        self.root_loop = Some(l);
    }

    /// True iff `block` is the header of its owning loop.
    ///
    /// # Panics
    ///
    /// Panics if loop analysis has not run.
    pub fn is_header(&self, block: Block) -> bool {
        let l = self.blocks[block]
            .owning_loop()
            .expect("is_header: loop analysis has not run");
        self.loops[l].header() == Some(block)
    }

    /// The cached reverse-postorder block sequence, if [`Graph::run_rpo`] has
    /// been called since the last structural edit that could invalidate it.
    pub fn cached_rpo(&self) -> Option<&[Block]> {
        self.rpo.as_deref()
    }

    pub(crate) fn marker_manager_mut(&mut self) -> &mut MarkerManager {
        &mut self.markers
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut PrimaryMap<Block, BasicBlock> {
        &mut self.blocks
    }

    pub(crate) fn loops_mut(&mut self) -> &mut PrimaryMap<Loop, LoopData> {
        &mut self.loops
    }

    // ---- mutators for crate::analysis (pub(super) on BasicBlock/LoopData is
    // scoped to `ir`, so the analysis passes go through these instead) -------

    pub(crate) fn set_block_idom(&mut self, block: Block, idom: Option<Block>) {
        self.blocks[block].set_idom(idom);
    }

    pub(crate) fn set_block_dominated(&mut self, block: Block, dominated: Vec<Block>) {
        self.blocks[block].set_dominated_blocks(dominated);
    }

    pub(crate) fn clear_block_dominated(&mut self, block: Block) {
        self.blocks[block].clear_dominated_blocks();
    }

    pub(crate) fn set_block_owning_loop(&mut self, block: Block, l: Loop) {
        self.blocks[block].set_owning_loop(l);
    }

    pub(crate) fn loop_push_latch(&mut self, l: Loop, latch: Block) {
        self.loops[l].push_latch(latch);
    }

    pub(crate) fn loop_push_member(&mut self, l: Loop, member: Block) {
        self.loops[l].push_member(member);
    }

    pub(crate) fn loop_push_inner(&mut self, l: Loop, inner: Loop) {
        self.loops[l].push_inner_loop(inner);
    }

    pub(crate) fn loop_set_outer(&mut self, l: Loop, outer: Loop) {
        self.loops[l].set_outer_loop(outer);
    }

    pub(crate) fn loop_set_reducible(&mut self, l: Loop, reducible: bool) {
        self.loops[l].set_reducible(reducible);
    }

    // ---- factories --------------------------------------------------------

    /// Create a new, empty block. The first block created in a graph becomes
    /// its [`Graph::start_block`].
    pub fn create_block(&mut self) -> Block {
        let block = self.blocks.push(BasicBlock::new());
        if self.start_block.is_none() {
            self.start_block = Some(block);
        }
        log::trace!("created block {block}");
        block
    }

    /// Create a loop record. Used directly only by the loop analyzer;
    /// front ends never call this.
    pub fn create_loop(&mut self, header: Option<Block>) -> Loop {
        let data = match header {
            Some(h) => LoopData::new_natural(h),
            None => LoopData::new_root(),
        };
        self.loops.push(data)
    }

    /// Construct a bare instruction with no inputs yet attached. Opcode,
    /// type, and payload are fixed at construction; inputs are added
    /// afterwards with [`Graph::set_input`]/[`Graph::append_input`].
    pub fn create_instruction(
        &mut self,
        opcode: Opcode,
        ty: PrimitiveType,
        data: InstructionData,
    ) -> Inst {
        let inst = self.instructions.push(Instruction::new(opcode, ty, data));
        log::trace!("created instruction {inst} ({opcode})");
        inst
    }

    /// Create-instruction-replacing: insert the
    /// already-constructed `new` instruction into `old`'s block immediately
    /// before `old`, transfer every one of `old`'s users onto `new`, then
    /// remove `old` from its block. Returns `new` for convenience chaining.
    ///
    /// This is the primary tool peephole-style rewrites use: build `new` with
    /// [`Graph::create_instruction`] and its inputs, then call this to swap
    /// it in for `old`.
    ///
    /// # Panics
    ///
    /// Panics if `old` has no parent block (it was already removed), or if
    /// `new` already belongs to a block.
    pub fn replace_instruction(&mut self, old: Inst, new: Inst) {
        let block = self.instructions[old]
            .parent_block()
            .expect("replace_instruction: `old` has no parent block");
        assert!(
            self.instructions[new].parent_block().is_none(),
            "replace_instruction: `new` already belongs to a block"
        );
        self.insert_instruction_before(block, old, new);
        self.replace_inputs_for_users(old, new);
        self.remove_instruction(old);
        log::debug!("replaced instruction {old} with {new}");
    }

    // ---- block instruction list ---------------------------------------

    /// Append `inst` to the end of `block`'s instruction list.
    ///
    /// # Panics
    ///
    /// Panics if `inst` already has a parent block.
    pub fn push_instruction(&mut self, block: Block, inst: Inst) {
        assert!(
            self.instructions[inst].parent_block().is_none(),
            "push_instruction: instruction {inst} already has a parent block"
        );
        let old_tail = self.blocks[block].last_insn();
        self.instructions[inst].prev = old_tail;
        self.instructions[inst].next = None;
        self.instructions[inst].parent = Some(block);
        match old_tail {
            Some(tail) => self.instructions[tail].next = Some(inst),
            None => self.blocks[block].set_first_insn(Some(inst)),
        }
        self.blocks[block].set_last_insn(Some(inst));
    }

    /// Insert `inst` immediately before `before` in `before`'s block.
    ///
    /// # Panics
    ///
    /// Panics if `inst` already has a parent block, or if `before` has none.
    pub fn insert_instruction_before(&mut self, block: Block, before: Inst, inst: Inst) {
        assert!(
            self.instructions[inst].parent_block().is_none(),
            "insert_instruction_before: instruction {inst} already has a parent block"
        );
        debug_assert_eq!(
            self.instructions[before].parent_block(),
            Some(block),
            "insert_instruction_before: `before` is not in `block`"
        );
        let prev = self.instructions[before].prev;
        self.instructions[inst].prev = prev;
        self.instructions[inst].next = Some(before);
        self.instructions[inst].parent = Some(block);
        self.instructions[before].prev = Some(inst);
        match prev {
            Some(p) => self.instructions[p].next = Some(inst),
            None => self.blocks[block].set_first_insn(Some(inst)),
        }
    }

    /// The instruction following `inst` in its block's list.
    pub fn next_inst(&self, inst: Inst) -> Option<Inst> {
        self.instructions[inst].next
    }

    /// The instruction preceding `inst` in its block's list.
    pub fn prev_inst(&self, inst: Inst) -> Option<Inst> {
        self.instructions[inst].prev
    }

    /// Remove `inst` from its block's instruction list and erase it as a
    /// user of each of its own inputs. The `Instruction` value itself is
    /// untouched in the instruction pool (dead-code elimination is a future
    /// pass); `inst.parent_block()` becomes `None`.
    ///
    /// Callers are responsible for ensuring `inst` has no remaining users
    /// before removing it (typically via [`Graph::replace_inputs_for_users`]
    /// or [`Graph::replace_instruction`]).
    ///
    /// # Panics
    ///
    /// Panics if `inst` has no parent block.
    pub fn remove_instruction(&mut self, inst: Inst) {
        let block = self.instructions[inst]
            .parent_block()
            .expect("remove_instruction: instruction has no parent block");
        let prev = self.instructions[inst].prev;
        let next = self.instructions[inst].next;
        match prev {
            Some(p) => self.instructions[p].next = next,
            None => self.blocks[block].set_first_insn(next),
        }
        match next {
            Some(n) => self.instructions[n].prev = prev,
            None => self.blocks[block].set_last_insn(prev),
        }

        let num_inputs = self.instructions[inst].inputs().len();
        for idx in 0..num_inputs {
            let def = self.instructions[inst].inputs()[idx];
            let use_id = self.instructions[inst].input_uses()[idx];
            let shared = (0..num_inputs).any(|j| {
                j != idx
                    && self.instructions[inst].inputs()[j] == def
                    && self.instructions[inst].input_uses()[j] == use_id
            });
            if !shared {
                self.unlink_user(def, use_id);
            }
        }

        let data = &mut self.instructions[inst];
        data.prev = None;
        data.next = None;
        data.parent = None;
        log::trace!("removed instruction {inst} from {block}");
    }

    // ---- def-use edges ------------------------------------------------

    fn link_user(&mut self, def: Inst, user: Inst) -> UseId {
        let id = self.uses.push(UseNode {
            user,
            prev: None,
            next: None,
        });
        let old_tail = self.instructions[def].users_tail;
        self.uses[id].prev = old_tail;
        match old_tail {
            Some(tail) => self.uses[tail].next = Some(id),
            None => self.instructions[def].users_head = Some(id),
        }
        self.instructions[def].users_tail = Some(id);
        id
    }

    fn unlink_user(&mut self, def: Inst, use_id: UseId) {
        let prev = self.uses[use_id].prev;
        let next = self.uses[use_id].next;
        match prev {
            Some(p) => self.uses[p].next = next,
            None => self.instructions[def].users_head = next,
        }
        match next {
            Some(n) => self.uses[n].prev = prev,
            None => self.instructions[def].users_tail = prev,
        }
    }

    /// Find an existing input slot of `inst` (other than `skip_idx`, if
    /// given) that already targets `def`, and return its `UseId` so a new
    /// slot can share the edge instead of allocating a redundant one. Scoped
    /// to the arity-2 fixed opcodes (see `allows_shared_input_use`);
    /// always returns `None` for every other opcode shape.
    fn find_shareable_use(&self, inst: Inst, def: Inst, skip_idx: Option<usize>) -> Option<UseId> {
        let opcode = self.instructions[inst].opcode();
        if !allows_shared_input_use(opcode) {
            return None;
        }
        let inputs = self.instructions[inst].inputs();
        let uses = self.instructions[inst].input_uses();
        inputs
            .iter()
            .zip(uses.iter())
            .enumerate()
            .find(|&(j, (&d, _))| Some(j) != skip_idx && d == def)
            .map(|(_, (_, &u))| u)
    }

    /// Append a new input to a variadic (`Phi`/`CallStatic`) instruction.
    ///
    /// # Panics
    ///
    /// Panics if `inst`'s opcode has a fixed arity that is already full.
    pub fn append_input(&mut self, inst: Inst, def: Inst) {
        let opcode = self.instructions[inst].opcode();
        let cur_len = self.instructions[inst].inputs().len();
        if let Some(cap) = max_arity(opcode) {
            assert!(
                cur_len < cap,
                "append_input: opcode {opcode} is already at its arity cap of {cap}"
            );
        }
        let use_id = match self.find_shareable_use(inst, def, None) {
            Some(id) if allows_shared_input_use(opcode) => id,
            _ => self.link_user(def, inst),
        };
        self.instructions[inst].push_input_raw(def, use_id);
    }

    /// Append an input to a `Phi` instruction together with the predecessor
    /// block it flows in from.
    ///
    /// # Panics
    ///
    /// Panics if `inst`'s opcode is not [`Opcode::Phi`].
    pub fn append_phi_input(&mut self, inst: Inst, def: Inst, pred: Block) {
        assert_eq!(
            self.instructions[inst].opcode(),
            Opcode::Phi,
            "append_phi_input: not a Phi instruction"
        );
        self.append_input(inst, def);
        match self.instructions[inst].data_mut() {
            InstructionData::Phi { pred_blocks } => pred_blocks.push(pred),
            _ => unreachable!(),
        }
    }

    /// Overwrite an existing input slot, updating def-use edges accordingly.
    ///
    /// For a fixed arity-2 opcode where another slot already targets the same
    /// def, the new edge shares that slot's user-list entry rather than
    /// allocating a second one. A no-op (returns without allocating or
    /// unlinking anything) if `new_def` is already the value at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds for `inst`'s current input count,
    /// i.e. this overwrites an existing slot only — use
    /// [`Graph::append_input`] to grow a variadic instruction.
    pub fn set_input(&mut self, inst: Inst, idx: usize, new_def: Inst) {
        let cur_len = self.instructions[inst].inputs().len();
        assert!(
            idx < cur_len,
            "set_input: index {idx} out of bounds (instruction has {cur_len} inputs)"
        );
        let old_def = self.instructions[inst].inputs()[idx];
        if old_def == new_def {
            return;
        }
        let old_use = self.instructions[inst].input_uses()[idx];
        let shares_old = (0..cur_len).any(|j| {
            j != idx
                && self.instructions[inst].inputs()[j] == old_def
                && self.instructions[inst].input_uses()[j] == old_use
        });
        if !shares_old {
            self.unlink_user(old_def, old_use);
        }
        let new_use = match self.find_shareable_use(inst, new_def, Some(idx)) {
            Some(id) => id,
            None => self.link_user(new_def, inst),
        };
        self.instructions[inst].inputs_mut()[idx] = new_def;
        self.instructions[inst].input_uses_mut()[idx] = new_use;
    }

    /// Set an instruction's initial inputs in one call, in order, applying
    /// the shared-edge rule across them exactly as repeated
    /// [`Graph::append_input`] calls would.
    ///
    /// # Panics
    ///
    /// Panics if `inst` already has inputs set (this is for initial
    /// construction only), or if `defs` exceeds the opcode's arity cap.
    pub fn init_inputs(&mut self, inst: Inst, defs: &[Inst]) {
        assert!(
            self.instructions[inst].inputs().is_empty(),
            "init_inputs: instruction already has inputs"
        );
        for &def in defs {
            self.append_input(inst, def);
        }
    }

    /// Swap `inputs[0]` and `inputs[1]` of a binary-shaped instruction.
    /// Used by commutative-normalization peepholes to move a constant
    /// operand into the `b` position.
    ///
    /// # Panics
    ///
    /// Panics if `inst` does not currently have exactly two inputs.
    pub fn swap_inputs(&mut self, inst: Inst) {
        self.instructions[inst].swap_inputs_raw();
    }

    /// For every user `U` of `def`, rewrite each of `U`'s input slots that
    /// targeted `def` to target `new` instead. Idempotent: once `def` has no
    /// users left, subsequent calls are no-ops.
    pub fn replace_inputs_for_users(&mut self, def: Inst, new: Inst) {
        let mut rewritten = 0u32;
        while let Some(use_id) = self.instructions[def].users_head {
            let user = self.uses[use_id].user;
            // `replace_inputs` below unlinks every one of `user`'s edges into
            // `def` in one call (including `use_id` itself), so re-reading
            // `users_head` fresh each iteration — rather than following a
            // `next` pointer captured before the call — is what keeps this
            // correct when `user` held more than one edge into `def`.
            let changed = self.replace_inputs(user, def, new);
            debug_assert!(changed, "replace_inputs_for_users: no-op iteration");
            rewritten += 1;
        }
        log::trace!("replace_inputs_for_users({def} -> {new}): rewrote {rewritten} users");
    }

    /// For `inst`, substitute every input currently equal to `old` with
    /// `new`. Returns whether any input changed. For `Phi`, the
    /// per-input predecessor-block association at each changed slot is left
    /// untouched (only the value changes, never which edge it's on).
    pub fn replace_inputs(&mut self, inst: Inst, old: Inst, new: Inst) -> bool {
        let len = self.instructions[inst].inputs().len();
        let mut changed = false;
        for idx in 0..len {
            if self.instructions[inst].inputs()[idx] == old {
                self.set_input(inst, idx, new);
                changed = true;
            }
        }
        changed
    }

    /// The first use-list entry of `def`'s users, for manual cursor-based
    /// traversal (see [`Graph::next_user`], [`Graph::user_inst`]) when a pass
    /// needs ordered, single-pass iteration rather than
    /// [`Graph::replace_inputs_for_users`]'s unordered drain.
    pub fn first_user(&self, def: Inst) -> Option<UseId> {
        self.instructions[def].users_head
    }

    /// The use-list entry following `use_id`. Capture this *before* any
    /// mutation driven by the current entry if the traversal needs a stable
    /// cursor through list edits.
    pub fn next_user(&self, use_id: UseId) -> Option<UseId> {
        self.uses[use_id].next
    }

    /// The user instruction a use-list entry refers to.
    pub fn user_inst(&self, use_id: UseId) -> Inst {
        self.uses[use_id].user
    }

    /// Iterate `def`'s current users in list order (oldest edge first).
    pub fn users(&self, def: Inst) -> impl Iterator<Item = Inst> + '_ {
        let mut cur = self.instructions[def].users_head;
        core::iter::from_fn(move || {
            let id = cur?;
            cur = self.uses[id].next;
            Some(self.uses[id].user)
        })
    }

    // ---- instruction-level dominance --------------------------------------

    /// True when `a` certainly executes before `b`: if they live in
    /// different blocks, this reduces to block dominance; otherwise it's a
    /// forward scan of the shared block finding `a` first.
    ///
    /// # Panics
    ///
    /// Panics if either instruction has no parent block, or if the
    /// dominator tree has not been built (when the blocks differ).
    pub fn inst_dominates(&self, a: Inst, b: Inst) -> bool {
        let block_a = self.instructions[a]
            .parent_block()
            .expect("inst_dominates: `a` has no parent block");
        let block_b = self.instructions[b]
            .parent_block()
            .expect("inst_dominates: `b` has no parent block");
        if block_a != block_b {
            return self.block_dominates(block_a, block_b);
        }
        let mut cur = self.blocks[block_a].first_insn();
        while let Some(i) = cur {
            if i == a {
                return true;
            }
            if i == b {
                return false;
            }
            cur = self.instructions[i].next;
        }
        false
    }

    /// True if `a == b` or `a` strictly dominates `b`.
    ///
    /// # Panics
    ///
    /// Panics if the dominator tree has not been built.
    pub fn block_dominates(&self, a: Block, b: Block) -> bool {
        self.blocks[a].dominates_over(a, b)
    }

    // ---- analysis entry points --------------------------------------------

    /// Compute the reverse-postorder block sequence from [`Graph::start_block`],
    /// cache it, and return it. Allocates and releases one marker.
    ///
    /// # Panics
    ///
    /// Panics if the graph has no blocks.
    pub fn run_rpo(&mut self) -> &[Block] {
        let start = self
            .start_block
            .expect("run_rpo: graph has no start block");
        log::debug!("running RPO from {start}");
        let marker = self.markers.create();
        let order = rpo::compute(self, start, marker);
        self.markers.erase(marker);
        log::info!("RPO computed: {} reachable blocks", order.len());
        self.rpo = Some(order);
        self.rpo.as_deref().unwrap()
    }

    /// Build the dominator tree: each reachable block's immediate dominator
    /// and dominated set. Idempotent — safe to call again after edits, and
    /// always recomputes from the current CFG rather than patching the old
    /// result.
    ///
    /// # Panics
    ///
    /// Panics if the graph has no blocks.
    pub fn build_dominator_tree(&mut self) {
        self.run_rpo();
        log::debug!("building dominator tree");
        dominator_tree::build(self);
        log::info!("dominator tree built");
    }

    /// Run the four-phase loop analyzer.
    ///
    /// # Panics
    ///
    /// Panics if the dominator tree has not been built.
    pub fn run_loop_analysis(&mut self) {
        log::debug!("running loop analysis");
        loop_analysis::analyze(self);
        log::info!("loop analysis complete: {} loops", self.loops.len());
    }
}
