// ==========================================
// 薄膜生产管理系统 - 分配规划引擎
// ==========================================
// 状态机: Init → SelectOrder → RankMachines → Commit → (还有工单? SelectOrder : Done)
// 贪心逐单提交, 不做全局寻优 (交互式"预览后应用"的确定性要求优先于最优性;
// 如需全局求解, 作为新算法标识暴露, 不替换本实现)
// 红线: 相同输入必须产出字节一致的方案 (机台选择与顺序完全可复现)
// ==========================================

use crate::domain::{
    DistributionAlgorithm, DistributionParams, Machine, ProductionOrder,
};
use crate::engine::scoring::{
    balanced_score, hybrid_score, load_based_score, MachineRunState,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

// ==========================================
// PlannedAssignment - 单条规划分配
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedAssignment {
    pub order_id: String,   // 工单编号
    pub machine_id: String, // 目标机台
    pub position: i64,      // 追加到的队列位置
    pub remaining_kg: f64,  // 分配质量 (未完成剩余量)
}

// ==========================================
// DistributionPlan - 规划结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionPlan {
    pub algorithm: DistributionAlgorithm,
    pub assignments: Vec<PlannedAssignment>,
}

impl DistributionPlan {
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// 指定机台的规划分配 (按提交顺序)
    pub fn assignments_for<'a>(
        &'a self,
        machine_id: &'a str,
    ) -> impl Iterator<Item = &'a PlannedAssignment> {
        self.assignments
            .iter()
            .filter(move |a| a.machine_id == machine_id)
    }
}

// ==========================================
// DistributionPlanner - 分配规划引擎
// ==========================================
pub struct DistributionPlanner {
    params: DistributionParams,
}

impl DistributionPlanner {
    pub fn new(params: DistributionParams) -> Self {
        Self { params }
    }

    /// 对内存快照执行一轮规划
    ///
    /// # 参数
    /// - `machines`: 全量机台 (非 ACTIVE 的在 Init 阶段剔除)
    /// - `queued`: 机台编号 → 现有排队工单 (计算初始负载与起始位置)
    /// - `unassigned`: 未分配工单集合 (不可分配的工单在此跳过)
    ///
    /// # 返回
    /// 尽力而为的完整方案; 无可用机台或无工单时返回空方案, 不是错误
    pub fn plan(
        &self,
        machines: &[Machine],
        queued: &HashMap<String, Vec<ProductionOrder>>,
        unassigned: &[ProductionOrder],
    ) -> DistributionPlan {
        // ===== Init: 快照 ACTIVE 机台运行视图 =====
        let mut states: Vec<MachineRunState> = machines
            .iter()
            .filter(|m| m.is_active())
            .map(|m| {
                let existing = queued
                    .get(&m.machine_id)
                    .map(|v| v.as_slice())
                    .unwrap_or(&[]);
                MachineRunState::from_queue(m.clone(), existing)
            })
            .collect();
        // 机台编号升序: 平分时最小编号胜出, 保证可复现
        states.sort_by(|a, b| a.machine.machine_id.cmp(&b.machine.machine_id));

        // ===== SelectOrder: 工单处理顺序 =====
        let mut orders: Vec<ProductionOrder> = unassigned
            .iter()
            .filter(|o| o.is_assignable())
            .cloned()
            .collect();
        if self.params.algorithm.is_priority_sequenced() {
            // 优先级降序, 同级按创建时间升序; 稳定排序保留输入顺序兜底
            orders.sort_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then_with(|| a.created_at.cmp(&b.created_at))
            });
        }

        let mut plan = DistributionPlan {
            algorithm: self.params.algorithm,
            assignments: Vec::with_capacity(orders.len()),
        };

        // 边界: 无可用机台或无工单 → 空方案
        if states.is_empty() || orders.is_empty() {
            info!(
                algorithm = %self.params.algorithm,
                machines = states.len(),
                orders = orders.len(),
                "分配规划: 输入为空, 返回空方案"
            );
            return plan;
        }

        // ===== RankMachines + Commit 循环 =====
        for order in &orders {
            let winner = self.rank_machines(order, &states);
            let state = &mut states[winner];
            let position = state.commit(order);

            debug!(
                order_id = %order.order_id,
                machine_id = %state.machine.machine_id,
                position,
                remaining_kg = order.remaining_kg(),
                "分配规划: 工单提交"
            );

            plan.assignments.push(PlannedAssignment {
                order_id: order.order_id.clone(),
                machine_id: state.machine.machine_id.clone(),
                position,
                remaining_kg: order.remaining_kg(),
            });
        }

        info!(
            algorithm = %self.params.algorithm,
            assigned = plan.assignments.len(),
            machines = states.len(),
            "分配规划完成"
        );
        plan
    }

    /// 为当前工单选出得分最高的机台下标
    ///
    /// 软容量策略: 追加后仍在容量内的机台优先参与排名;
    /// 全部机台都装不下时才在超容机台中排名 (超容降权, 不硬排除)
    ///
    /// 调用前提: states 非空且已按机台编号升序
    fn rank_machines(&self, order: &ProductionOrder, states: &[MachineRunState]) -> usize {
        let fitting: Vec<usize> = (0..states.len())
            .filter(|&i| states[i].fits(order))
            .collect();
        let candidates: Vec<usize> = if fitting.is_empty() {
            (0..states.len()).collect()
        } else {
            fitting
        };

        // 候选按机台编号升序遍历, 仅严格更优才替换 → 平分归最小编号
        let mut best = candidates[0];
        let mut best_key = self.rank_key(order, &states[best]);
        for &i in &candidates[1..] {
            let key = self.rank_key(order, &states[i]);
            if key > best_key {
                best = i;
                best_key = key;
            }
        }
        best
    }

    /// 机台排名键 (字典序比较, 越大越优)
    ///
    /// 各算法的主分与平分键:
    /// - balanced: (-工单数); 平分 → 机台编号
    /// - load-based / priority 内层: (-负载率, -绝对投影负载)
    /// - product-type: 同类在队 → (1, -绝对投影负载); 无同类 → 回退 load-based
    /// - hybrid: (组合分, -绝对投影负载)
    fn rank_key(&self, order: &ProductionOrder, state: &MachineRunState) -> RankKey {
        match self.params.algorithm {
            DistributionAlgorithm::Balanced => RankKey(balanced_score(state), 0.0, 0.0),
            DistributionAlgorithm::LoadBased | DistributionAlgorithm::Priority => RankKey(
                load_based_score(order, state),
                -state.projected_load_kg(order),
                0.0,
            ),
            DistributionAlgorithm::ProductType => {
                if state.has_product_type(&order.product_type) {
                    RankKey(1.0, -state.projected_load_kg(order), 0.0)
                } else {
                    RankKey(
                        0.0,
                        load_based_score(order, state),
                        -state.projected_load_kg(order),
                    )
                }
            }
            DistributionAlgorithm::Hybrid => {
                let weights = self.params.effective_weights();
                RankKey(
                    hybrid_score(order, state, &weights),
                    -state.projected_load_kg(order),
                    0.0,
                )
            }
        }
    }
}

// 排名键: 三级字典序, 分量永不为 NaN
#[derive(Debug, Clone, Copy, PartialEq)]
struct RankKey(f64, f64, f64);

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(
            self.0
                .total_cmp(&other.0)
                .then(self.1.total_cmp(&other.1))
                .then(self.2.total_cmp(&other.2)),
        )
    }
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{
        MachineSection, MachineStatus, OrderStatus, PriorityLevel,
    };
    use crate::domain::HybridWeights;
    use chrono::{Duration, Utc};

    fn machine(id: &str, status: MachineStatus, max_capacity_kg: f64) -> Machine {
        Machine {
            machine_id: id.to_string(),
            name: format!("机台{}", id),
            section: MachineSection::Cutting,
            status,
            production_rate_kg_h: 50.0,
            max_capacity_kg,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn order_at(
        id: &str,
        remaining: f64,
        product_type: &str,
        priority: PriorityLevel,
        created_offset_min: i64,
    ) -> ProductionOrder {
        ProductionOrder {
            order_id: id.to_string(),
            customer_order_id: None,
            product_type: product_type.to_string(),
            quantity_required_kg: remaining,
            produced_kg: 0.0,
            priority,
            status: OrderStatus::Pending,
            created_at: Utc::now() + Duration::minutes(created_offset_min),
        }
    }

    fn order(id: &str, remaining: f64) -> ProductionOrder {
        order_at(id, remaining, "PE-80", PriorityLevel::Normal, 0)
    }

    fn planner(algorithm: DistributionAlgorithm) -> DistributionPlanner {
        DistributionPlanner::new(DistributionParams::new(algorithm, None))
    }

    fn no_queues() -> HashMap<String, Vec<ProductionOrder>> {
        HashMap::new()
    }

    #[test]
    fn test_scenario_01_balanced_spreads_counts() {
        // 场景1: balanced 无初始负载时工单数量差 ≤ 1
        let machines = vec![
            machine("M1", MachineStatus::Active, 10_000.0),
            machine("M2", MachineStatus::Active, 10_000.0),
            machine("M3", MachineStatus::Active, 10_000.0),
        ];
        let orders: Vec<ProductionOrder> =
            (0..7).map(|i| order(&format!("PO-{}", i), 10.0)).collect();

        let plan = planner(DistributionAlgorithm::Balanced).plan(&machines, &no_queues(), &orders);
        assert_eq!(plan.assignments.len(), 7);

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for a in &plan.assignments {
            *counts.entry(a.machine_id.as_str()).or_insert(0) += 1;
        }
        let max = counts.values().max().unwrap();
        let min = counts.values().min().unwrap();
        assert!(max - min <= 1, "counts={:?}", counts);
    }

    #[test]
    fn test_scenario_02_load_based_reference() {
        // 场景2 (规格基准): 容量 [100,100,50], 两张 30kg 工单
        // → 分别落在 M1/M2, 不重复, 不落 M3
        let machines = vec![
            machine("M1", MachineStatus::Active, 100.0),
            machine("M2", MachineStatus::Active, 100.0),
            machine("M3", MachineStatus::Active, 50.0),
        ];
        let orders = vec![order("PO-1", 30.0), order("PO-2", 30.0)];

        let plan = planner(DistributionAlgorithm::LoadBased).plan(&machines, &no_queues(), &orders);
        assert_eq!(plan.assignments.len(), 2);
        assert_eq!(plan.assignments[0].order_id, "PO-1");
        assert_eq!(plan.assignments[0].machine_id, "M1"); // 平分 → 最小编号
        assert_eq!(plan.assignments[1].order_id, "PO-2");
        assert_eq!(plan.assignments[1].machine_id, "M2"); // M1 已提交 30kg
    }

    #[test]
    fn test_scenario_03_priority_sequencing() {
        // 场景3: priority 算法按优先级降序处理, 同级按创建时间升序
        let machines = vec![machine("M1", MachineStatus::Active, 1000.0)];
        let orders = vec![
            order_at("PO-normal", 10.0, "PE-80", PriorityLevel::Normal, 0),
            order_at("PO-urgent-late", 10.0, "PE-80", PriorityLevel::Urgent, 5),
            order_at("PO-urgent-early", 10.0, "PE-80", PriorityLevel::Urgent, 1),
            order_at("PO-high", 10.0, "PE-80", PriorityLevel::High, 2),
        ];

        let plan = planner(DistributionAlgorithm::Priority).plan(&machines, &no_queues(), &orders);
        let sequence: Vec<&str> = plan.assignments.iter().map(|a| a.order_id.as_str()).collect();
        assert_eq!(
            sequence,
            vec!["PO-urgent-early", "PO-urgent-late", "PO-high", "PO-normal"]
        );
        // 单机台上的位置稠密递增
        let positions: Vec<i64> = plan.assignments.iter().map(|a| a.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_scenario_04_product_type_grouping() {
        // 场景4: 已排同类产品的机台优先, 无同类时回退 load-based
        let machines = vec![
            machine("M1", MachineStatus::Active, 1000.0),
            machine("M2", MachineStatus::Active, 1000.0),
        ];
        let mut queued = HashMap::new();
        // M2 队列里已有 PA-60, 且负载高于 M1
        queued.insert(
            "M2".to_string(),
            vec![order_at("Q1", 400.0, "PA-60", PriorityLevel::Normal, -60)],
        );

        let orders = vec![
            order_at("PO-pa", 50.0, "PA-60", PriorityLevel::Normal, 0),
            order_at("PO-pet", 50.0, "PET-12", PriorityLevel::Normal, 1),
        ];
        let plan = planner(DistributionAlgorithm::ProductType).plan(&machines, &queued, &orders);

        let by_order: HashMap<&str, &str> = plan
            .assignments
            .iter()
            .map(|a| (a.order_id.as_str(), a.machine_id.as_str()))
            .collect();
        // 同类聚合胜过低负载
        assert_eq!(by_order["PO-pa"], "M2");
        // 无同类 → load-based 回退到低负载机台
        assert_eq!(by_order["PO-pet"], "M1");
    }

    #[test]
    fn test_scenario_05_hybrid_load_only_equals_load_based() {
        // 场景5: hybrid (100,0,0,0) 的机台选择与纯 load-based 完全一致
        let machines = vec![
            machine("M1", MachineStatus::Active, 100.0),
            machine("M2", MachineStatus::Active, 100.0),
            machine("M3", MachineStatus::Active, 50.0),
        ];
        let mut queued = HashMap::new();
        queued.insert("M2".to_string(), vec![order_at("Q1", 20.0, "PE-80", PriorityLevel::Normal, -30)]);

        // 同一优先级且按创建顺序, 使两种算法的工单处理顺序一致
        let orders: Vec<ProductionOrder> = (0..4)
            .map(|i| order_at(&format!("PO-{}", i), 15.0, "PE-80", PriorityLevel::Normal, i))
            .collect();

        let load_plan =
            planner(DistributionAlgorithm::LoadBased).plan(&machines, &queued, &orders);
        let hybrid_planner = DistributionPlanner::new(DistributionParams::new(
            DistributionAlgorithm::Hybrid,
            Some(HybridWeights {
                load: 100.0,
                capacity: 0.0,
                priority: 0.0,
                product_type: 0.0,
            }),
        ));
        let hybrid_plan = hybrid_planner.plan(&machines, &queued, &orders);

        let pick = |p: &DistributionPlan| -> Vec<(String, String)> {
            p.assignments
                .iter()
                .map(|a| (a.order_id.clone(), a.machine_id.clone()))
                .collect()
        };
        assert_eq!(pick(&load_plan), pick(&hybrid_plan));
    }

    #[test]
    fn test_scenario_05b_hybrid_load_only_with_zero_capacity_machine() {
        // 场景5b: 容量为 0 的机台在场时 (100,0,0,0) 仍与纯 load-based 同选
        // (M1 容量 0, M2 容量 100 已压 150kg → 两种算法都必须选 M2)
        let machines = vec![
            machine("M1", MachineStatus::Active, 0.0),
            machine("M2", MachineStatus::Active, 100.0),
        ];
        let mut queued = HashMap::new();
        queued.insert(
            "M2".to_string(),
            vec![order_at("Q1", 150.0, "PE-80", PriorityLevel::Normal, -30)],
        );
        let orders = vec![order("PO-1", 30.0)];

        let load_plan =
            planner(DistributionAlgorithm::LoadBased).plan(&machines, &queued, &orders);
        let hybrid_planner = DistributionPlanner::new(DistributionParams::new(
            DistributionAlgorithm::Hybrid,
            Some(HybridWeights {
                load: 100.0,
                capacity: 0.0,
                priority: 0.0,
                product_type: 0.0,
            }),
        ));
        let hybrid_plan = hybrid_planner.plan(&machines, &queued, &orders);

        assert_eq!(load_plan.assignments[0].machine_id, "M2");
        assert_eq!(hybrid_plan.assignments[0].machine_id, "M2");
    }

    #[test]
    fn test_scenario_06_determinism() {
        // 场景6: 相同输入两次规划产出完全一致
        let machines = vec![
            machine("M1", MachineStatus::Active, 300.0),
            machine("M2", MachineStatus::Active, 300.0),
            machine("M3", MachineStatus::Active, 300.0),
        ];
        let orders: Vec<ProductionOrder> = (0..10)
            .map(|i| {
                order_at(
                    &format!("PO-{:02}", i),
                    20.0 + i as f64,
                    if i % 2 == 0 { "PE-80" } else { "PA-60" },
                    if i % 3 == 0 { PriorityLevel::High } else { PriorityLevel::Normal },
                    i,
                )
            })
            .collect();

        let p = planner(DistributionAlgorithm::Hybrid);
        let a = p.plan(&machines, &no_queues(), &orders);
        let b = p.plan(&machines, &no_queues(), &orders);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_scenario_07_no_duplicate_orders_in_plan() {
        // 场景7: 方案内工单集合 ⊆ 输入集合, 无跨机台重复
        let machines = vec![
            machine("M1", MachineStatus::Active, 100.0),
            machine("M2", MachineStatus::Active, 100.0),
        ];
        let orders: Vec<ProductionOrder> =
            (0..6).map(|i| order(&format!("PO-{}", i), 40.0)).collect();

        let plan = planner(DistributionAlgorithm::Balanced).plan(&machines, &no_queues(), &orders);
        let mut seen = std::collections::HashSet::new();
        for a in &plan.assignments {
            assert!(seen.insert(a.order_id.clone()), "重复分配: {}", a.order_id);
            assert!(orders.iter().any(|o| o.order_id == a.order_id));
        }
        assert_eq!(plan.assignments.len(), 6);
    }

    #[test]
    fn test_scenario_08_empty_inputs_not_error() {
        // 场景8: 无 ACTIVE 机台 / 无工单 → 空方案
        let down_only = vec![machine("M1", MachineStatus::Down, 100.0)];
        let plan = planner(DistributionAlgorithm::LoadBased).plan(
            &down_only,
            &no_queues(),
            &[order("PO-1", 30.0)],
        );
        assert!(plan.is_empty());

        let active = vec![machine("M1", MachineStatus::Active, 100.0)];
        let plan = planner(DistributionAlgorithm::LoadBased).plan(&active, &no_queues(), &[]);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_scenario_09_non_active_machines_excluded() {
        // 场景9: 检修/停机机台不参与
        let machines = vec![
            machine("M1", MachineStatus::Maintenance, 1000.0),
            machine("M2", MachineStatus::Active, 100.0),
            machine("M3", MachineStatus::Down, 1000.0),
        ];
        let plan = planner(DistributionAlgorithm::Balanced).plan(
            &machines,
            &no_queues(),
            &[order("PO-1", 30.0)],
        );
        assert_eq!(plan.assignments.len(), 1);
        assert_eq!(plan.assignments[0].machine_id, "M2");
    }

    #[test]
    fn test_scenario_10_zero_remaining_skipped() {
        // 场景10: 剩余量 0 的工单跳过
        let machines = vec![machine("M1", MachineStatus::Active, 100.0)];
        let done = ProductionOrder {
            produced_kg: 50.0,
            ..order("PO-done", 50.0)
        };
        let plan = planner(DistributionAlgorithm::LoadBased).plan(
            &machines,
            &no_queues(),
            &[done, order("PO-live", 30.0)],
        );
        assert_eq!(plan.assignments.len(), 1);
        assert_eq!(plan.assignments[0].order_id, "PO-live");
    }

    #[test]
    fn test_scenario_11_overflow_soft_not_excluded() {
        // 场景11: 全部机台都装不下时仍产出方案 (超容降权非硬排除)
        let machines = vec![
            machine("M1", MachineStatus::Active, 50.0),
            machine("M2", MachineStatus::Active, 40.0),
        ];
        let plan = planner(DistributionAlgorithm::LoadBased).plan(
            &machines,
            &no_queues(),
            &[order("PO-big", 200.0)],
        );
        assert_eq!(plan.assignments.len(), 1);
        // 超容集合内按负载率排名: 200/50 < 200/40 → M1
        assert_eq!(plan.assignments[0].machine_id, "M1");
    }

    #[test]
    fn test_scenario_12_fitting_machine_preferred_over_overloaded() {
        // 场景12: 有机台装得下时, 超容机台不参与排名
        let machines = vec![
            // M1 很空闲但装不下本单
            machine("M1", MachineStatus::Active, 25.0),
            // M2 负载率更高但装得下
            machine("M2", MachineStatus::Active, 100.0),
        ];
        let mut queued = HashMap::new();
        queued.insert("M2".to_string(), vec![order_at("Q1", 60.0, "PE-80", PriorityLevel::Normal, -30)]);

        let plan = planner(DistributionAlgorithm::LoadBased).plan(
            &machines,
            &queued,
            &[order("PO-1", 30.0)],
        );
        assert_eq!(plan.assignments[0].machine_id, "M2");
    }

    #[test]
    fn test_scenario_13_positions_continue_existing_queue() {
        // 场景13: 追加位置从现有队列长度继续
        let machines = vec![machine("M1", MachineStatus::Active, 1000.0)];
        let mut queued = HashMap::new();
        queued.insert(
            "M1".to_string(),
            vec![
                order_at("Q1", 10.0, "PE-80", PriorityLevel::Normal, -10),
                order_at("Q2", 10.0, "PE-80", PriorityLevel::Normal, -9),
            ],
        );
        let plan = planner(DistributionAlgorithm::Balanced).plan(
            &machines,
            &queued,
            &[order("PO-1", 10.0), order("PO-2", 10.0)],
        );
        let positions: Vec<i64> = plan.assignments.iter().map(|a| a.position).collect();
        assert_eq!(positions, vec![2, 3]);
    }
}
